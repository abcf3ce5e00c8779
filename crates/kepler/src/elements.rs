//! Classical orbital elements with computed (never stored) derived quantities.

use std::f64::consts::TAU;

/// Classical Keplerian elements. Angles in radians, distances in km.
///
/// Immutable snapshot semantics: derived quantities such as the period or the
/// apoapsis radius are computed on demand. For `eccentricity >= 1` the orbit
/// is non-periodic and the period/apoapsis accessors return `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerianElements {
    /// Semi-latus rectum p (km). Finite and positive for every conic.
    pub semi_latus_rectum_km: f64,
    /// Eccentricity, >= 0.
    pub eccentricity: f64,
    /// Inclination (rad).
    pub inclination_rad: f64,
    /// Right ascension of the ascending node (rad).
    pub raan_rad: f64,
    /// Argument of periapsis (rad).
    pub arg_periapsis_rad: f64,
    /// True anomaly at the epoch the elements snapshot was taken (rad).
    pub true_anomaly_rad: f64,
}

impl KeplerianElements {
    /// Build elements from a semi-major axis instead of the semi-latus rectum.
    /// `semi_major_axis_km` must be negative for hyperbolic orbits.
    pub fn from_semi_major_axis(
        semi_major_axis_km: f64,
        eccentricity: f64,
        inclination_rad: f64,
        raan_rad: f64,
        arg_periapsis_rad: f64,
        true_anomaly_rad: f64,
    ) -> Self {
        Self {
            semi_latus_rectum_km: semi_major_axis_km * (1.0 - eccentricity * eccentricity),
            eccentricity,
            inclination_rad,
            raan_rad,
            arg_periapsis_rad,
            true_anomaly_rad,
        }
    }

    /// Semi-major axis (km). Negative for hyperbolic orbits, `None` when the
    /// orbit is parabolic and the axis is unbounded.
    pub fn semi_major_axis_km(&self) -> Option<f64> {
        let one_minus_e2 = 1.0 - self.eccentricity * self.eccentricity;
        if one_minus_e2.abs() < 1e-12 {
            None
        } else {
            Some(self.semi_latus_rectum_km / one_minus_e2)
        }
    }

    /// Periapsis radius (km).
    pub fn periapsis_km(&self) -> f64 {
        self.semi_latus_rectum_km / (1.0 + self.eccentricity)
    }

    /// Apoapsis radius (km); `None` for non-periodic orbits.
    pub fn apoapsis_km(&self) -> Option<f64> {
        if self.eccentricity >= 1.0 {
            None
        } else {
            Some(self.semi_latus_rectum_km / (1.0 - self.eccentricity))
        }
    }

    /// Mean motion (rad/s) about a body with parameter `mu` (km³/s²).
    /// Defined for elliptic and hyperbolic orbits, `None` for parabolic.
    pub fn mean_motion_rad_s(&self, mu_km3_s2: f64) -> Option<f64> {
        let a = self.semi_major_axis_km()?;
        Some((mu_km3_s2 / a.abs().powi(3)).sqrt())
    }

    /// Orbital period (s); `None` for non-periodic orbits.
    pub fn period_s(&self, mu_km3_s2: f64) -> Option<f64> {
        if self.eccentricity >= 1.0 {
            return None;
        }
        self.mean_motion_rad_s(mu_km3_s2).map(|n| TAU / n)
    }

    /// Radius at a given true anomaly (km). Unbounded anomalies on a
    /// hyperbola (beyond the asymptote) yield non-positive denominators and
    /// return `None`.
    pub fn radius_at_true_anomaly_km(&self, true_anomaly_rad: f64) -> Option<f64> {
        let denom = 1.0 + self.eccentricity * true_anomaly_rad.cos();
        if denom <= 0.0 {
            None
        } else {
            Some(self.semi_latus_rectum_km / denom)
        }
    }
}
