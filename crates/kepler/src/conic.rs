//! The canonical two-body propagation abstraction: elements + epoch + mu.

use std::f64::consts::TAU;

use orbital_core::StateVector;
use orbital_core::vector::{self, Vector3};
use thiserror::Error;

use crate::anomaly::{self, ConvergenceError};
use crate::elements::KeplerianElements;

/// Eccentricity below which the orbit is treated as circular for angle
/// conventions (argument of periapsis fixed at zero).
const CIRCULAR_ECCENTRICITY: f64 = 1e-8;
/// Sine-of-inclination magnitude below which the orbit is treated as
/// equatorial (node fixed along +X).
const EQUATORIAL_NODE: f64 = 1e-8;

/// Errors from conic construction and propagation queries.
#[derive(Debug, Error)]
pub enum ConicError {
    #[error("state vector is degenerate: {reason}")]
    DegenerateState { reason: &'static str },
    #[error("orbit is parabolic; mean-motion propagation is undefined")]
    Parabolic,
    #[error("radius {radius_km} km is never reached by this orbit")]
    RadiusOutOfRange { radius_km: f64 },
    #[error(transparent)]
    Convergence(#[from] ConvergenceError),
}

/// A full orbit: classical elements snapshotted at an epoch, plus the
/// gravitational parameter of the central body. Owns no external resources
/// and is cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conic {
    elements: KeplerianElements,
    mu_km3_s2: f64,
    epoch_s: f64,
    /// Mean anomaly at `epoch_s`, derived once from the element snapshot.
    mean_anomaly_at_epoch: f64,
}

impl Conic {
    /// Build a conic from an element snapshot valid at `epoch_s`.
    pub fn from_elements(elements: KeplerianElements, mu_km3_s2: f64, epoch_s: f64) -> Self {
        let ecc_anomaly = anomaly::true_to_anomaly(elements.eccentricity, elements.true_anomaly_rad);
        let mean_anomaly_at_epoch = anomaly::anomaly_to_mean(elements.eccentricity, ecc_anomaly);
        Self {
            elements,
            mu_km3_s2,
            epoch_s,
            mean_anomaly_at_epoch,
        }
    }

    /// Build a conic from a state vector valid at `epoch_s`.
    ///
    /// Near-circular and near-equatorial states lose angular precision (the
    /// node and periapsis directions are conventions there) but never produce
    /// NaN; a state with no angular momentum is rejected.
    pub fn from_state_vector(
        state: &StateVector,
        mu_km3_s2: f64,
        epoch_s: f64,
    ) -> Result<Self, ConicError> {
        let r = state.position_km;
        let v = state.velocity_km_s;
        let r_mag = vector::norm(&r);
        if r_mag <= 0.0 {
            return Err(ConicError::DegenerateState {
                reason: "position at the frame origin",
            });
        }

        let h = vector::cross(&r, &v);
        let h_mag = vector::norm(&h);
        if h_mag < 1e-9 * r_mag {
            return Err(ConicError::DegenerateState {
                reason: "radial trajectory (zero angular momentum)",
            });
        }

        let p = h_mag * h_mag / mu_km3_s2;
        let v2 = vector::dot(&v, &v);
        let rv = vector::dot(&r, &v);

        // Eccentricity vector points at periapsis.
        let e_vec = vector::scale(
            &vector::sub(
                &vector::scale(&r, v2 - mu_km3_s2 / r_mag),
                &vector::scale(&v, rv),
            ),
            1.0 / mu_km3_s2,
        );
        let ecc = vector::norm(&e_vec);

        let inclination = (h[2] / h_mag).clamp(-1.0, 1.0).acos();

        // Node vector; undefined for equatorial orbits, where we fix the node
        // along +X so downstream angles stay finite.
        let n = [-h[1], h[0], 0.0];
        let n_mag = vector::norm(&n);
        let equatorial = n_mag < EQUATORIAL_NODE * h_mag;
        let node = if equatorial {
            [1.0, 0.0, 0.0]
        } else {
            vector::scale(&n, 1.0 / n_mag)
        };

        let raan = if equatorial {
            0.0
        } else {
            let raw = node[1].atan2(node[0]);
            if raw < 0.0 { raw + TAU } else { raw }
        };

        let circular = ecc < CIRCULAR_ECCENTRICITY;
        let arg_periapsis = if circular {
            0.0
        } else {
            let cos_w = (vector::dot(&node, &e_vec) / ecc).clamp(-1.0, 1.0);
            let mut w = cos_w.acos();
            // e_vec below the node plane reflects the angle.
            let above = if equatorial { e_vec[1] } else { e_vec[2] };
            if above < 0.0 {
                w = TAU - w;
            }
            w
        };

        let true_anomaly = if circular {
            // Argument of latitude stands in for the true anomaly.
            let cos_u = vector::dot(&node, &r) / r_mag;
            let mut u = cos_u.clamp(-1.0, 1.0).acos();
            let above = if equatorial { r[1] } else { r[2] };
            if above < 0.0 {
                u = TAU - u;
            }
            u
        } else {
            let cos_nu = (vector::dot(&e_vec, &r) / (ecc * r_mag)).clamp(-1.0, 1.0);
            let mut nu = cos_nu.acos();
            if rv < 0.0 {
                nu = TAU - nu;
            }
            if ecc >= 1.0 && nu > std::f64::consts::PI {
                // Hyperbolic anomalies are signed, not wrapped.
                nu -= TAU;
            }
            nu
        };

        let elements = KeplerianElements {
            semi_latus_rectum_km: p,
            eccentricity: ecc,
            inclination_rad: inclination,
            raan_rad: raan,
            arg_periapsis_rad: arg_periapsis,
            true_anomaly_rad: true_anomaly,
        };
        Ok(Self::from_elements(elements, mu_km3_s2, epoch_s))
    }

    /// Element snapshot at the conic's epoch.
    pub fn elements(&self) -> &KeplerianElements {
        &self.elements
    }

    /// Gravitational parameter of the central body (km³/s²).
    pub fn mu_km3_s2(&self) -> f64 {
        self.mu_km3_s2
    }

    /// Epoch the element snapshot is valid at (s).
    pub fn epoch_s(&self) -> f64 {
        self.epoch_s
    }

    /// Mean anomaly at the epoch (rad).
    pub fn mean_anomaly_at_epoch(&self) -> f64 {
        self.mean_anomaly_at_epoch
    }

    /// Orbital period (s); `None` for non-periodic orbits.
    pub fn period_s(&self) -> Option<f64> {
        self.elements.period_s(self.mu_km3_s2)
    }

    /// Periapsis radius (km).
    pub fn periapsis_km(&self) -> f64 {
        self.elements.periapsis_km()
    }

    /// Apoapsis radius (km); `None` for non-periodic orbits.
    pub fn apoapsis_km(&self) -> Option<f64> {
        self.elements.apoapsis_km()
    }

    /// Speed at periapsis (km/s), the maximum on the orbit.
    pub fn max_speed_km_s(&self) -> f64 {
        (self.mu_km3_s2 / self.elements.semi_latus_rectum_km).sqrt() * (1.0 + self.elements.eccentricity)
    }

    /// Speed at apoapsis (km/s); `None` for non-periodic orbits.
    pub fn min_speed_km_s(&self) -> Option<f64> {
        if self.elements.eccentricity >= 1.0 {
            None
        } else {
            Some(
                (self.mu_km3_s2 / self.elements.semi_latus_rectum_km).sqrt()
                    * (1.0 - self.elements.eccentricity),
            )
        }
    }

    /// State vector at the conic's own epoch.
    pub fn state_vector_at_epoch(&self) -> StateVector {
        self.perifocal_state(self.elements.true_anomaly_rad)
    }

    /// Propagate to an arbitrary time: advance the mean anomaly linearly,
    /// solve Kepler's equation, and reconstruct the rotated state vector.
    pub fn state_vector_at(&self, time_s: f64) -> Result<StateVector, ConicError> {
        let n = self
            .elements
            .mean_motion_rad_s(self.mu_km3_s2)
            .ok_or(ConicError::Parabolic)?;
        let mean = self.mean_anomaly_at_epoch + n * (time_s - self.epoch_s);
        let ecc_anomaly = anomaly::solve(self.elements.eccentricity, mean)?;
        let nu = anomaly::anomaly_to_true(self.elements.eccentricity, ecc_anomaly);
        Ok(self.perifocal_state(nu))
    }

    /// Times after the epoch at which the orbit crosses the given radius.
    ///
    /// Elliptic orbits return the two crossings within the first period after
    /// the epoch (one entry when the crossing is at an apsis); hyperbolic
    /// orbits return the inbound/outbound passage times, which may precede
    /// the epoch; a near-circular orbit holds its radius at every time and
    /// returns the epoch. A radius outside [periapsis, apoapsis] is an error.
    pub fn times_at_radius(&self, radius_km: f64) -> Result<Vec<f64>, ConicError> {
        let e = self.elements.eccentricity;
        let p = self.elements.semi_latus_rectum_km;
        if e < CIRCULAR_ECCENTRICITY {
            let lo = self.elements.periapsis_km();
            let hi = self.elements.apoapsis_km().unwrap_or(lo);
            if radius_km < lo || radius_km > hi {
                return Err(ConicError::RadiusOutOfRange { radius_km });
            }
            return Ok(vec![self.epoch_s]);
        }
        let cos_nu = (p / radius_km - 1.0) / e;
        if !(-1.0..=1.0).contains(&cos_nu) {
            return Err(ConicError::RadiusOutOfRange { radius_km });
        }
        let nu = cos_nu.acos();
        let mut times: Vec<f64> = [nu, -nu]
            .iter()
            .map(|&n| self.time_at_true_anomaly(n))
            .collect::<Result<_, _>>()?;
        times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        times.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        Ok(times)
    }

    /// First time at or after the epoch with the given mean anomaly
    /// (elliptic), or the unique such time (hyperbolic).
    pub fn time_at_mean_anomaly(&self, mean_anomaly: f64) -> Result<f64, ConicError> {
        let n = self
            .elements
            .mean_motion_rad_s(self.mu_km3_s2)
            .ok_or(ConicError::Parabolic)?;
        let mut dt = (mean_anomaly - self.mean_anomaly_at_epoch) / n;
        if self.elements.eccentricity < 1.0 {
            let period = TAU / n;
            dt = dt.rem_euclid(period);
        }
        Ok(self.epoch_s + dt)
    }

    fn time_at_true_anomaly(&self, true_anomaly: f64) -> Result<f64, ConicError> {
        let e = self.elements.eccentricity;
        let ecc_anomaly = anomaly::true_to_anomaly(e, true_anomaly);
        let mean = anomaly::anomaly_to_mean(e, ecc_anomaly);
        if e < 1.0 {
            self.time_at_mean_anomaly(mean)
        } else {
            let n = self
                .elements
                .mean_motion_rad_s(self.mu_km3_s2)
                .ok_or(ConicError::Parabolic)?;
            Ok(self.epoch_s + (mean - self.mean_anomaly_at_epoch) / n)
        }
    }

    /// Build the inertial state for a true anomaly via the perifocal frame
    /// and the 3-1-3 rotation by RAAN, inclination, and argument of periapsis.
    fn perifocal_state(&self, true_anomaly: f64) -> StateVector {
        let e = self.elements.eccentricity;
        let p = self.elements.semi_latus_rectum_km;
        let r_mag = p / (1.0 + e * true_anomaly.cos());
        let (sin_nu, cos_nu) = true_anomaly.sin_cos();

        let r_pf = [r_mag * cos_nu, r_mag * sin_nu, 0.0];
        let vel_scale = (self.mu_km3_s2 / p).sqrt();
        let v_pf = [-vel_scale * sin_nu, vel_scale * (e + cos_nu), 0.0];

        StateVector {
            position_km: self.rotate_to_inertial(&r_pf),
            velocity_km_s: self.rotate_to_inertial(&v_pf),
        }
    }

    fn rotate_to_inertial(&self, v: &Vector3) -> Vector3 {
        let (sin_raan, cos_raan) = self.elements.raan_rad.sin_cos();
        let (sin_inc, cos_inc) = self.elements.inclination_rad.sin_cos();
        let (sin_w, cos_w) = self.elements.arg_periapsis_rad.sin_cos();

        // Rows of R3(-RAAN) * R1(-i) * R3(-w).
        let row_x = [
            cos_raan * cos_w - sin_raan * sin_w * cos_inc,
            -cos_raan * sin_w - sin_raan * cos_w * cos_inc,
            sin_raan * sin_inc,
        ];
        let row_y = [
            sin_raan * cos_w + cos_raan * sin_w * cos_inc,
            -sin_raan * sin_w + cos_raan * cos_w * cos_inc,
            -cos_raan * sin_inc,
        ];
        let row_z = [sin_w * sin_inc, cos_w * sin_inc, cos_inc];

        [
            vector::dot(&row_x, v),
            vector::dot(&row_y, v),
            vector::dot(&row_z, v),
        ]
    }
}
