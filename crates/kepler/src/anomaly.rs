//! Kepler equation solver for elliptic, hyperbolic, and near-parabolic orbits.

use thiserror::Error;

/// Residual tolerance for the Newton iterations.
const TOLERANCE: f64 = 1e-10;
/// Iteration cap for the regular elliptic/hyperbolic branches.
const MAX_ITERATIONS: usize = 60;
/// Iteration cap for the damped near-parabolic branch.
const MAX_ITERATIONS_NEAR_PARABOLIC: usize = 250;
/// Lower edge of the near-parabolic eccentricity band.
const NEAR_PARABOLIC_LOW: f64 = 0.999;
/// Upper edge of the near-parabolic eccentricity band.
const NEAR_PARABOLIC_HIGH: f64 = 1.001;
/// Derivative floor applied inside the near-parabolic band, where the
/// elliptic derivative 1 - e·cos E approaches zero at periapsis.
const DERIVATIVE_FLOOR: f64 = 1e-2;
/// Maximum Newton step inside the near-parabolic band (radians).
const STEP_CLAMP: f64 = 1.0;

/// Kepler equation iteration failed to reach tolerance within the cap.
#[derive(Debug, Error)]
#[error(
    "kepler solver did not converge (e = {eccentricity}, M = {mean_anomaly}, residual = {residual:.3e} after {iterations} iterations)"
)]
pub struct ConvergenceError {
    pub eccentricity: f64,
    pub mean_anomaly: f64,
    pub residual: f64,
    pub iterations: usize,
}

/// Solve Kepler's equation for the given eccentricity and mean anomaly.
///
/// Returns the eccentric anomaly for `e < 1` and the hyperbolic anomaly for
/// `e > 1`. Eccentricities in `[0.999, 1.001]` are handled by a damped
/// iteration that avoids the singular derivative near `e = 1`; the band
/// limits are part of the contract and must not be re-derived.
pub fn solve(eccentricity: f64, mean_anomaly: f64) -> Result<f64, ConvergenceError> {
    debug_assert!(eccentricity >= 0.0, "eccentricity must be non-negative");
    if eccentricity < NEAR_PARABOLIC_LOW {
        solve_elliptic(eccentricity, mean_anomaly)
    } else if eccentricity > NEAR_PARABOLIC_HIGH {
        solve_hyperbolic(eccentricity, mean_anomaly)
    } else {
        solve_near_parabolic(eccentricity, mean_anomaly)
    }
}

/// Inverse of [`solve`]: mean anomaly for an eccentric (`e <= 1`) or
/// hyperbolic (`e > 1`) anomaly. `e = 1` follows the elliptic branch to
/// stay consistent with the near-parabolic solver.
pub fn anomaly_to_mean(eccentricity: f64, anomaly: f64) -> f64 {
    if eccentricity <= 1.0 {
        anomaly - eccentricity * anomaly.sin()
    } else {
        eccentricity * anomaly.sinh() - anomaly
    }
}

/// True anomaly for an eccentric (`e < 1`) or hyperbolic (`e > 1`) anomaly.
pub fn anomaly_to_true(eccentricity: f64, anomaly: f64) -> f64 {
    if eccentricity < 1.0 {
        let half = anomaly / 2.0;
        let y = (1.0 + eccentricity).sqrt() * half.sin();
        let x = (1.0 - eccentricity).sqrt() * half.cos();
        2.0 * y.atan2(x)
    } else {
        let half = anomaly / 2.0;
        let y = (eccentricity + 1.0).sqrt() * half.tanh();
        let x = (eccentricity - 1.0).sqrt();
        2.0 * y.atan2(x)
    }
}

/// Eccentric (`e < 1`) or hyperbolic (`e > 1`) anomaly for a true anomaly.
pub fn true_to_anomaly(eccentricity: f64, true_anomaly: f64) -> f64 {
    if eccentricity < 1.0 {
        let half = true_anomaly / 2.0;
        let y = (1.0 - eccentricity).sqrt() * half.sin();
        let x = (1.0 + eccentricity).sqrt() * half.cos();
        2.0 * y.atan2(x)
    } else {
        let half = true_anomaly / 2.0;
        let t = ((eccentricity - 1.0) / (eccentricity + 1.0)).sqrt() * half.tan();
        // atanh(t); valid only while the true anomaly is inside the asymptote.
        2.0 * (0.5 * ((1.0 + t) / (1.0 - t)).ln())
    }
}

fn solve_elliptic(e: f64, mean_anomaly: f64) -> Result<f64, ConvergenceError> {
    let m = normalize_angle(mean_anomaly);
    let mut anomaly = m;
    let mut residual = f64::MAX;

    for _ in 0..MAX_ITERATIONS {
        let f = anomaly - e * anomaly.sin() - m;
        residual = f.abs();
        if residual < TOLERANCE {
            return Ok(anomaly + (mean_anomaly - m));
        }
        let fp = 1.0 - e * anomaly.cos();
        anomaly -= f / fp;
    }

    Err(ConvergenceError {
        eccentricity: e,
        mean_anomaly,
        residual,
        iterations: MAX_ITERATIONS,
    })
}

fn solve_hyperbolic(e: f64, mean_anomaly: f64) -> Result<f64, ConvergenceError> {
    // Asymptotic starter; the linear guess diverges badly for large |M|.
    let mut anomaly = if mean_anomaly.abs() > 1e-12 {
        mean_anomaly.signum() * (2.0 * mean_anomaly.abs() / e + 1.8).ln()
    } else {
        mean_anomaly
    };
    let mut residual = f64::MAX;

    for _ in 0..MAX_ITERATIONS {
        let f = e * anomaly.sinh() - anomaly - mean_anomaly;
        residual = f.abs();
        if residual < TOLERANCE {
            return Ok(anomaly);
        }
        let fp = e * anomaly.cosh() - 1.0;
        anomaly -= f / fp;
    }

    Err(ConvergenceError {
        eccentricity: e,
        mean_anomaly,
        residual,
        iterations: MAX_ITERATIONS,
    })
}

fn solve_near_parabolic(e: f64, mean_anomaly: f64) -> Result<f64, ConvergenceError> {
    let elliptic = e <= 1.0;
    let (m, offset) = if elliptic {
        let m = normalize_angle(mean_anomaly);
        (m, mean_anomaly - m)
    } else {
        (mean_anomaly, 0.0)
    };

    // Cube-root starter: near e = 1 the equation behaves like anomaly³/6 = M.
    let mut anomaly = (6.0 * m).cbrt();
    if !anomaly.is_finite() {
        anomaly = m;
    }
    let mut residual = f64::MAX;

    for _ in 0..MAX_ITERATIONS_NEAR_PARABOLIC {
        let (f, fp) = if elliptic {
            (anomaly - e * anomaly.sin() - m, 1.0 - e * anomaly.cos())
        } else {
            (e * anomaly.sinh() - anomaly - m, e * anomaly.cosh() - 1.0)
        };
        residual = f.abs();
        if residual < TOLERANCE {
            return Ok(anomaly + offset);
        }
        let step = f / fp.abs().max(DERIVATIVE_FLOOR) * fp.signum();
        anomaly -= step.clamp(-STEP_CLAMP, STEP_CLAMP);
    }

    Err(ConvergenceError {
        eccentricity: e,
        mean_anomaly,
        residual,
        iterations: MAX_ITERATIONS_NEAR_PARABOLIC,
    })
}

/// Reduce an angle to [0, 2π).
fn normalize_angle(angle: f64) -> f64 {
    angle.rem_euclid(std::f64::consts::TAU)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_orbit_anomaly_equals_mean() {
        let e = solve(0.0, 1.0).unwrap();
        assert!((e - 1.0).abs() < 1e-12);
    }

    #[test]
    fn elliptic_round_trip() {
        for &e in &[0.0167, 0.2056, 0.7, 0.95, 0.998] {
            for &m in &[0.01, 0.5, 1.5, 3.0, 5.5] {
                let anomaly = solve(e, m).unwrap();
                let back = anomaly_to_mean(e, anomaly);
                assert!(
                    (normalize_angle(back) - normalize_angle(m)).abs() < 1e-9,
                    "e={e} m={m}: got {back}"
                );
            }
        }
    }

    #[test]
    fn hyperbolic_round_trip() {
        for &e in &[1.05, 1.5, 3.0, 10.0] {
            for &m in &[-4.0, -0.3, 0.2, 1.0, 8.0] {
                let anomaly = solve(e, m).unwrap();
                let back = anomaly_to_mean(e, anomaly);
                assert!((back - m).abs() < 1e-8, "e={e} m={m}: got {back}");
            }
        }
    }

    #[test]
    fn near_parabolic_band_converges() {
        for &e in &[0.999, 0.9995, 1.0, 1.0005, 1.001] {
            for &m in &[0.001, 0.05, 0.5, 2.0] {
                let anomaly = solve(e, m).unwrap();
                let back = anomaly_to_mean(e, anomaly);
                assert!((back - m).abs() < 1e-8, "e={e} m={m}: got {back}");
            }
        }
    }

    #[test]
    fn true_anomaly_round_trip() {
        for &e in &[0.1, 0.6, 1.4] {
            for &nu in &[-1.2, -0.2, 0.4, 1.1] {
                let anomaly = true_to_anomaly(e, nu);
                let back = anomaly_to_true(e, anomaly);
                assert!((back - nu).abs() < 1e-9, "e={e} nu={nu}: got {back}");
            }
        }
    }
}
