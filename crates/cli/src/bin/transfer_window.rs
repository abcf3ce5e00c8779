use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::Parser;
use orbital_mission_engine::config::{BodyConfig, load_bodies};
use orbital_mission_engine::core::constants::{J2000_JD, MU_SUN, SECONDS_PER_DAY};
use orbital_mission_engine::core::units::deg_to_rad;
use orbital_mission_engine::kepler::{Conic, KeplerianElements, anomaly};
use orbital_mission_engine::transfer::{
    SearchBounds, SearchSettings, SearchStatus, TransferSample, TransferSearch, WindowDataset,
    sample_point,
};

/// Sweep a departure/time-of-flight window between two catalog bodies, write
/// the grid as CSV, and refine the cheapest transfer with the adaptive search.
#[derive(Parser, Debug)]
#[command(author, version, about = "Transfer window CSV generator")]
struct Cli {
    /// Body catalog (YAML file, TOML file, or directory of TOML records)
    #[arg(long, default_value = "configs/bodies.yaml")]
    bodies: PathBuf,

    /// Origin body name (case-insensitive)
    #[arg(long)]
    from: String,

    /// Destination body name (case-insensitive)
    #[arg(long)]
    to: String,

    /// Departure window start (Julian date)
    #[arg(long)]
    depart_start_jd: f64,

    /// Departure window end (Julian date)
    #[arg(long)]
    depart_end_jd: f64,

    /// Minimum time of flight in days
    #[arg(long)]
    tof_min_days: f64,

    /// Maximum time of flight in days
    #[arg(long)]
    tof_max_days: f64,

    /// Grid step in days for the CSV sweep
    #[arg(long, default_value_t = 5.0)]
    step_days: f64,

    /// Refinement stops once cells shrink below this many days per axis
    #[arg(long, default_value_t = 0.25)]
    resolution_days: f64,

    /// Reject transfers whose conic dips below this periapsis radius (km)
    #[arg(long)]
    min_periapsis: Option<f64>,

    /// Also evaluate the long-way Lambert branch
    #[arg(long, default_value_t = false)]
    long_way: bool,

    /// Gravitational parameter of the central body (km^3/s^2)
    #[arg(long, default_value_t = MU_SUN)]
    mu: f64,

    /// Lambert evaluations per refinement round
    #[arg(long, default_value_t = 512)]
    budget: usize,

    /// Output CSV file (use '-' for stdout)
    #[arg(long, default_value = "artifacts/window.csv")]
    output: PathBuf,

    /// Optional JSON dataset with the swept samples and search bounds
    #[arg(long)]
    dataset: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let bodies = load_bodies(&cli.bodies)
        .with_context(|| format!("loading body catalog {}", cli.bodies.display()))?;
    let origin_cfg = find_body(&bodies, &cli.from)?;
    let destination_cfg = find_body(&bodies, &cli.to)?;
    let origin = conic_for(&origin_cfg, cli.mu)?;
    let destination = conic_for(&destination_cfg, cli.mu)?;

    if cli.depart_end_jd <= cli.depart_start_jd {
        return Err(anyhow!("departure window end must be after start"));
    }
    if cli.tof_max_days <= cli.tof_min_days {
        return Err(anyhow!("time-of-flight window end must be after start"));
    }

    let bounds = SearchBounds {
        depart_start_s: jd_to_seconds(cli.depart_start_jd),
        depart_end_s: jd_to_seconds(cli.depart_end_jd),
        tof_min_s: cli.tof_min_days * SECONDS_PER_DAY,
        tof_max_s: cli.tof_max_days * SECONDS_PER_DAY,
    };
    let settings = SearchSettings {
        mu_km3_s2: cli.mu,
        min_cell_depart_s: cli.resolution_days.max(1e-3) * SECONDS_PER_DAY,
        min_cell_tof_s: cli.resolution_days.max(1e-3) * SECONDS_PER_DAY,
        min_periapsis_km: cli.min_periapsis,
        include_long_way: cli.long_way,
    };

    let step_s = cli.step_days.max(0.1) * SECONDS_PER_DAY;
    let samples = sweep_grid(&origin, &destination, &settings, &bounds, step_s);

    let mut writer = writer_for_path(&cli.output)?;
    writeln!(
        writer,
        "depart_jd,arrive_jd,tof_days,dv_dep_km_s,dv_arr_km_s,dv_total_km_s,path"
    )?;
    for sample in &samples {
        write_sample(writer.as_mut(), sample)?;
    }
    writer.flush()?;

    if let Some(path) = &cli.dataset {
        let dataset = WindowDataset::new(&origin_cfg.name, &destination_cfg.name, &bounds, samples);
        dataset
            .save(path)
            .with_context(|| format!("writing dataset {}", path.display()))?;
    }

    let mut search = TransferSearch::new(origin, destination, bounds, settings);
    let best = loop {
        match search.step(cli.budget) {
            SearchStatus::Running { .. } => continue,
            SearchStatus::Converged { best } => break Some(best),
            SearchStatus::Exhausted { best } => break best,
        }
    };

    match best {
        Some(best) => {
            println!(
                "best transfer: depart JD {:.3}, arrive JD {:.3}, tof {:.2} days, dv {:.3} km/s ({}), {} evaluations",
                seconds_to_jd(best.depart_s),
                seconds_to_jd(best.arrive_s),
                best.tof_s / SECONDS_PER_DAY,
                best.dv_total_km_s,
                if best.long_way { "long way" } else { "short way" },
                search.evaluations(),
            );
        }
        None => println!("no feasible transfer inside the window"),
    }

    Ok(())
}

fn find_body(bodies: &[BodyConfig], name: &str) -> anyhow::Result<BodyConfig> {
    let upper = name.to_uppercase();
    bodies
        .iter()
        .find(|b| b.name.to_uppercase() == upper)
        .cloned()
        .ok_or_else(|| anyhow!("body '{}' not found in catalog", name))
}

/// Build a heliocentric conic from the catalog elements of `body`.
fn conic_for(body: &BodyConfig, mu_km3_s2: f64) -> anyhow::Result<Conic> {
    let cfg = body
        .elements
        .as_ref()
        .ok_or_else(|| anyhow!("body '{}' has no orbital elements in the catalog", body.name))?;
    let mean_anomaly = deg_to_rad(cfg.mean_anomaly_deg);
    let eccentric = anomaly::solve(cfg.eccentricity, mean_anomaly)
        .map_err(|e| anyhow!("anomaly solve failed for '{}': {e}", body.name))?;
    let true_anomaly = anomaly::anomaly_to_true(cfg.eccentricity, eccentric);
    let elements = KeplerianElements::from_semi_major_axis(
        cfg.semi_major_axis_km,
        cfg.eccentricity,
        deg_to_rad(cfg.inclination_deg),
        deg_to_rad(cfg.raan_deg),
        deg_to_rad(cfg.arg_periapsis_deg),
        true_anomaly,
    );
    Ok(Conic::from_elements(
        elements,
        mu_km3_s2,
        jd_to_seconds(cfg.epoch_jd),
    ))
}

fn sweep_grid(
    origin: &Conic,
    destination: &Conic,
    settings: &SearchSettings,
    bounds: &SearchBounds,
    step_s: f64,
) -> Vec<TransferSample> {
    let mut samples = Vec::new();
    let mut depart_s = bounds.depart_start_s;
    while depart_s <= bounds.depart_end_s {
        let mut tof_s = bounds.tof_min_s;
        while tof_s <= bounds.tof_max_s {
            if let Ok(sample) = sample_point(origin, destination, settings, depart_s, tof_s) {
                samples.push(sample);
            }
            tof_s += step_s;
        }
        depart_s += step_s;
    }
    samples
}

/// Create a writer for the target path, handling stdout (`-`) by convention.
fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = fs::File::create(path)?;
    Ok(Box::new(io::BufWriter::new(file)))
}

fn write_sample(writer: &mut dyn Write, sample: &TransferSample) -> io::Result<()> {
    writeln!(
        writer,
        "{:.6},{:.6},{:.4},{:.6},{:.6},{:.6},{}",
        seconds_to_jd(sample.depart_s),
        seconds_to_jd(sample.arrive_s),
        sample.tof_s / SECONDS_PER_DAY,
        sample.dv_depart_km_s,
        sample.dv_arrive_km_s,
        sample.dv_total_km_s,
        if sample.long_way { "long" } else { "short" },
    )
}

fn jd_to_seconds(jd: f64) -> f64 {
    (jd - J2000_JD) * SECONDS_PER_DAY
}

fn seconds_to_jd(seconds: f64) -> f64 {
    J2000_JD + seconds / SECONDS_PER_DAY
}
