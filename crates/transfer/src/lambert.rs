//! Universal-variable Lambert solver.
//!
//! Given two position vectors and a time of flight, find the conic that
//! connects them. The time-of-flight equation is expressed in the universal
//! variable z through the Stumpff functions C(z) and S(z), which cover the
//! elliptic, parabolic, and hyperbolic regimes in one formulation, and is
//! solved by Newton iteration.

use orbital_core::StateVector;
use orbital_core::vector::{self, Vector3};
use orbital_kepler::Conic;

use crate::NavigationError;

const TOLERANCE_S: f64 = 1e-8;
const MAX_ITERATIONS: usize = 80;
/// Below this value of 1+cos(Δν) the transfer plane is undetermined.
const DEGENERATE_TRANSFER_ANGLE: f64 = 1e-3;

/// Which way around the central body the transfer goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPath {
    /// True anomaly change below 180°.
    Short,
    /// True anomaly change above 180°.
    Long,
}

/// Velocities and connecting orbit solving the boundary-value problem.
#[derive(Debug, Clone)]
pub struct LambertSolution {
    pub r1_km: Vector3,
    pub r2_km: Vector3,
    pub tof_s: f64,
    pub v1_km_s: Vector3,
    pub v2_km_s: Vector3,
    pub mu_km3_s2: f64,
    pub path: TransferPath,
    /// Transfer orbit, with epoch 0 at departure.
    pub conic: Conic,
}

/// Solve the Lambert problem between `r1_km` and `r2_km` over `tof_s`.
pub fn solve(
    r1_km: Vector3,
    r2_km: Vector3,
    tof_s: f64,
    mu_km3_s2: f64,
    path: TransferPath,
) -> Result<LambertSolution, NavigationError> {
    if tof_s <= 0.0 {
        return Err(NavigationError::InvalidTimeOfFlight { tof_s });
    }
    let r1_mag = vector::norm(&r1_km);
    let r2_mag = vector::norm(&r2_km);
    if r1_mag <= 0.0 || r2_mag <= 0.0 {
        return Err(NavigationError::DegenerateGeometry {
            reason: "endpoint at the frame origin",
        });
    }

    let cos_dnu = vector::dot(&r1_km, &r2_km) / (r1_mag * r2_mag);
    if 1.0 + cos_dnu < DEGENERATE_TRANSFER_ANGLE {
        // Near-180° geometry leaves the transfer plane undetermined.
        return Err(NavigationError::DegenerateGeometry {
            reason: "transfer angle too close to 180 degrees",
        });
    }

    // Geometry constant A; its sign selects the short or long branch.
    let a_geom = match path {
        TransferPath::Short => (r1_mag * r2_mag * (1.0 + cos_dnu)).sqrt(),
        TransferPath::Long => -(r1_mag * r2_mag * (1.0 + cos_dnu)).sqrt(),
    };
    if a_geom == 0.0 {
        return Err(NavigationError::DegenerateGeometry {
            reason: "collinear endpoints",
        });
    }

    let sqrt_mu = mu_km3_s2.sqrt();
    let mut z = 0.0f64;
    let mut y = 0.0f64;
    let mut residual = f64::INFINITY;
    let mut converged = false;

    for _ in 0..MAX_ITERATIONS {
        let (c2, c3) = stumpff(z);
        y = r1_mag + r2_mag + a_geom * (z * c3 - 1.0) / c2.sqrt();
        if a_geom > 0.0 && y < 0.0 {
            // Long before the root for slow transfers; walk z up until the
            // universal chord turns physical.
            z += 0.1;
            continue;
        }

        let chi = (y / c2).sqrt();
        let tof_trial = (chi * chi * chi * c3 + a_geom * y.sqrt()) / sqrt_mu;
        residual = tof_s - tof_trial;
        if residual.abs() < TOLERANCE_S {
            converged = true;
            break;
        }

        let dt_dz = if z.abs() < 1e-8 {
            let sqrt2 = std::f64::consts::SQRT_2;
            (sqrt2 / 40.0 * y.powf(1.5) + a_geom / 8.0 * (y.sqrt() + a_geom * (1.0 / (2.0 * y)).sqrt()))
                / sqrt_mu
        } else {
            let c2_prime = (1.0 - z * c3 - 2.0 * c2) / (2.0 * z);
            let c3_prime = (c2 - 3.0 * c3) / (2.0 * z);
            let term1 = chi * chi * chi * (c3_prime - 3.0 * c3 * c2_prime / (2.0 * c2));
            let term2 = a_geom / 8.0 * (3.0 * c3 * y.sqrt() / c2 + a_geom / chi);
            (term1 + term2) / sqrt_mu
        };
        if !dt_dz.is_finite() || dt_dz == 0.0 {
            break;
        }
        z += residual / dt_dz;
    }

    if !converged {
        return Err(NavigationError::NonConvergence {
            iterations: MAX_ITERATIONS,
            residual_s: residual,
        });
    }

    // Lagrange coefficients give both terminal velocities.
    let f = 1.0 - y / r1_mag;
    let g = a_geom * (y / mu_km3_s2).sqrt();
    let g_dot = 1.0 - y / r2_mag;
    if g == 0.0 {
        return Err(NavigationError::DegenerateGeometry {
            reason: "zero Lagrange g coefficient",
        });
    }

    let v1_km_s = vector::scale(&vector::sub(&r2_km, &vector::scale(&r1_km, f)), 1.0 / g);
    let v2_km_s = vector::scale(&vector::sub(&vector::scale(&r2_km, g_dot), &r1_km), 1.0 / g);

    let departure = StateVector::new(r1_km, v1_km_s);
    let conic = Conic::from_state_vector(&departure, mu_km3_s2, 0.0)?;

    Ok(LambertSolution {
        r1_km,
        r2_km,
        tof_s,
        v1_km_s,
        v2_km_s,
        mu_km3_s2,
        path,
        conic,
    })
}

/// Stumpff functions C(z) and S(z), with series expansions near z = 0.
fn stumpff(z: f64) -> (f64, f64) {
    if z > 1e-6 {
        let sz = z.sqrt();
        ((1.0 - sz.cos()) / z, (sz - sz.sin()) / (z * sz))
    } else if z < -1e-6 {
        let sz = (-z).sqrt();
        ((sz.cosh() - 1.0) / -z, (sz.sinh() - sz) / (-z * sz))
    } else {
        // Leading series terms keep the z→0 limit smooth.
        (
            0.5 - z / 24.0 + z * z / 720.0,
            1.0 / 6.0 - z / 120.0 + z * z / 5040.0,
        )
    }
}
