//! Configuration models and loaders for the orbital mission engine.
//!
//! Records load from a YAML file holding a list, from a single TOML file
//! holding one record, or from a directory of TOML files read in sorted
//! order. The structs here stay plain data; turning them into conics,
//! atmospheres, or ephemeris catalogs is the caller's job.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Celestial body parameters parsed from scenario manifests.
#[derive(Debug, Deserialize, Clone)]
pub struct BodyConfig {
    pub name: String,
    pub mu_km3_s2: f64,
    pub radius_km: f64,
    #[serde(default)]
    pub atmosphere: Option<AtmosphereConfig>,
    /// Osculating elements for bodies modelled as conics rather than read
    /// from an ephemeris.
    #[serde(default)]
    pub elements: Option<ElementsConfig>,
}

/// Atmospheric metadata for drag and entry modelling.
#[derive(Debug, Deserialize, Clone)]
pub struct AtmosphereConfig {
    pub surface_density_kg_m3: f64,
    pub scale_height_km: f64,
    #[serde(default)]
    pub rotation_rate_rad_s: f64,
    pub speed_of_sound_km_s: f64,
}

/// Keplerian elements as written in manifests. Angles are in degrees there;
/// the math crates work in radians.
#[derive(Debug, Deserialize, Clone)]
pub struct ElementsConfig {
    pub semi_major_axis_km: f64,
    pub eccentricity: f64,
    #[serde(default)]
    pub inclination_deg: f64,
    #[serde(default)]
    pub raan_deg: f64,
    #[serde(default)]
    pub arg_periapsis_deg: f64,
    #[serde(default)]
    pub mean_anomaly_deg: f64,
    pub epoch_jd: f64,
}

/// Vehicle parameters parsed from scenario catalogs.
#[derive(Debug, Deserialize, Clone)]
pub struct VehicleConfig {
    pub name: String,
    pub mass_kg: f64,
    pub thrust_n: f64,
    pub exhaust_velocity_m_s: f64,
    #[serde(default)]
    pub accel_limit_m_s2: Option<f64>,
}

/// One ephemeris span in a catalog manifest. Mirrors the descriptor the
/// ephemeris crate builds its lazy proxies from.
#[derive(Debug, Deserialize, Clone)]
pub struct SpanConfig {
    pub filename: String,
    pub start_jd: f64,
    pub end_jd: f64,
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Load body configurations from a YAML file, TOML file, or directory.
pub fn load_bodies<P: AsRef<Path>>(path: P) -> Result<Vec<BodyConfig>, ConfigError> {
    load_records(path)
}

/// Load vehicle configurations from a YAML file, TOML file, or directory.
pub fn load_vehicles<P: AsRef<Path>>(path: P) -> Result<Vec<VehicleConfig>, ConfigError> {
    load_records(path)
}

/// Load an ephemeris span catalog.
pub fn load_spans<P: AsRef<Path>>(path: P) -> Result<Vec<SpanConfig>, ConfigError> {
    load_records(path)
}

fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        read_dir_records(path)
    } else if path.extension().map(|ext| ext == "toml").unwrap_or(false) {
        let contents = std::fs::read_to_string(path)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn read_dir_records<T>(dir: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut records = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map(|ext| ext == "toml").unwrap_or(false))
        .collect();
    entries.sort();
    for path in entries {
        let contents = std::fs::read_to_string(&path)?;
        let record: T = toml::from_str(&contents)?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    const BODIES_YAML: &str = r#"
- name: Earth
  mu_km3_s2: 398600.4418
  radius_km: 6378.137
  atmosphere:
    surface_density_kg_m3: 1.225
    scale_height_km: 8.5
    rotation_rate_rad_s: 7.2921159e-5
    speed_of_sound_km_s: 0.340
- name: Mars
  mu_km3_s2: 42828.37
  radius_km: 3396.2
  elements:
    semi_major_axis_km: 227939366.0
    eccentricity: 0.0934
    inclination_deg: 1.85
    epoch_jd: 2451545.0
"#;

    #[test]
    fn bodies_parse_from_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(BODIES_YAML.as_bytes()).unwrap();

        let bodies = load_bodies(file.path()).unwrap();
        assert_eq!(bodies.len(), 2);
        assert!(bodies[0].atmosphere.is_some());
        assert!(bodies[0].elements.is_none());
        let mars = bodies[1].elements.as_ref().unwrap();
        assert_eq!(mars.raan_deg, 0.0);
        assert!((mars.eccentricity - 0.0934).abs() < 1e-12);
    }

    #[test]
    fn vehicles_parse_from_toml_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b_lander.toml"),
            "name = \"lander\"\nmass_kg = 8000.0\nthrust_n = 45000.0\nexhaust_velocity_m_s = 3050.0\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a_upper.toml"),
            "name = \"upper\"\nmass_kg = 120000.0\nthrust_n = 1000000.0\nexhaust_velocity_m_s = 4200.0\naccel_limit_m_s2 = 40.0\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let vehicles = load_vehicles(dir.path()).unwrap();
        assert_eq!(vehicles.len(), 2);
        // Directory records load in sorted filename order.
        assert_eq!(vehicles[0].name, "upper");
        assert_eq!(vehicles[0].accel_limit_m_s2, Some(40.0));
        assert_eq!(vehicles[1].accel_limit_m_s2, None);
    }
}
