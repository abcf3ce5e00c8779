//! Linear ascent guidance (IGM).
//!
//! Closed-loop parametric guidance for powered ascent to a target orbit. Each
//! tick the program builds a radial/crossrange/downrange frame from the
//! current position and the target orbital plane, computes velocity-to-be-
//! gained, and predicts time-to-go from an exponential burn model. On a
//! coarse cadence it refits a linear steering law (pitch ≈ A + B·t,
//! yaw ≈ C + D·t) by solving a 2×2 system built from the burn integrals; the
//! integrals are redefined piecewise when an acceleration limit caps the burn.

use orbital_core::units;
use orbital_core::vector::{self, Vector3};
use orbital_kepler::Conic;

use crate::{AttitudeController, GuidanceError, GuidanceProgram, Telemetry};

/// Interval between steering-law refits. Between refits the fitted
/// coefficients extrapolate linearly in time.
const REFIT_INTERVAL_S: f64 = 2.0;
/// Below this velocity-to-be-gained (m/s) the law stops refitting and holds
/// the downrange direction.
const VGO_FLOOR_M_S: f64 = 1e-6;

/// Cutoff conditions for the ascent.
#[derive(Debug, Clone, Copy)]
pub struct TargetOrbit {
    pub radius_km: f64,
    pub speed_km_s: f64,
    /// Unit normal of the target orbital plane.
    pub plane_normal: Vector3,
}

impl TargetOrbit {
    /// Insertion at the periapsis of `conic`, horizontally.
    pub fn from_conic(conic: &Conic) -> Self {
        let elements = conic.elements();
        let (sin_i, cos_i) = elements.inclination_rad.sin_cos();
        let (sin_raan, cos_raan) = elements.raan_rad.sin_cos();
        Self {
            radius_km: conic.periapsis_km(),
            speed_km_s: conic.max_speed_km_s(),
            plane_normal: [sin_raan * sin_i, -cos_raan * sin_i, cos_i],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SteeringFit {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    fitted_at_s: f64,
}

/// Burn integrals of the thrust-acceleration profile over the remaining burn:
/// L = ∫a, J = ∫a·t, P = ∫a·t².
#[derive(Debug, Clone, Copy)]
struct BurnIntegrals {
    l: f64,
    j: f64,
    p: f64,
}

pub struct Igm {
    target: TargetOrbit,
    accel_limit_m_s2: Option<f64>,
    fit: Option<SteeringFit>,
    time_to_go_s: f64,
    warning: bool,
}

impl Igm {
    pub fn new(target: TargetOrbit, accel_limit_m_s2: Option<f64>) -> Self {
        Self {
            target,
            accel_limit_m_s2,
            fit: None,
            time_to_go_s: 0.0,
            warning: false,
        }
    }

    /// Predicted seconds until cutoff, from the last `compute`.
    pub fn time_to_go_s(&self) -> f64 {
        self.time_to_go_s
    }

    /// A numeric-range failure was signaled on some earlier tick.
    pub fn warning(&self) -> bool {
        self.warning
    }

    pub fn clear_warning(&mut self) {
        self.warning = false;
    }

    /// Exponential-phase burn integrals over [t0, t1], with a(t) = ve/(τ−t).
    fn exponential_integrals(ve: f64, tau: f64, t0: f64, t1: f64) -> BurnIntegrals {
        let log_term = ((tau - t0) / (tau - t1)).ln();
        let l = ve * log_term;
        let j = tau * l - ve * (t1 - t0);
        let p = tau * tau * ve * log_term
            - ve * (t1 - t0) * tau
            - ve * (t1 * t1 - t0 * t0) / 2.0;
        BurnIntegrals { l, j, p }
    }

    /// Constant-acceleration phase over [t0, t1] at `a_lim`.
    fn constant_integrals(a_lim: f64, t0: f64, t1: f64) -> BurnIntegrals {
        BurnIntegrals {
            l: a_lim * (t1 - t0),
            j: a_lim * (t1 * t1 - t0 * t0) / 2.0,
            p: a_lim * (t1 * t1 * t1 - t0 * t0 * t0) / 3.0,
        }
    }

    /// Burn integrals over the whole remaining burn of length `tgo`. When the
    /// acceleration limit engages before cutoff, the profile splits at
    /// t_lim = τ − ve/a_lim: exponential until there, constant after.
    fn burn_integrals(&self, ve: f64, tau: f64, tgo: f64) -> BurnIntegrals {
        match self.accel_limit_m_s2 {
            Some(a_lim) => {
                let t_lim = tau - ve / a_lim;
                if t_lim > 0.0 && t_lim < tgo {
                    let head = Self::exponential_integrals(ve, tau, 0.0, t_lim);
                    let tail = Self::constant_integrals(a_lim, t_lim, tgo);
                    BurnIntegrals {
                        l: head.l + tail.l,
                        j: head.j + tail.j,
                        p: head.p + tail.p,
                    }
                } else {
                    Self::exponential_integrals(ve, tau, 0.0, tgo)
                }
            }
            None => Self::exponential_integrals(ve, tau, 0.0, tgo),
        }
    }

    fn refit(
        &mut self,
        time_s: f64,
        ve: f64,
        tau: f64,
        tgo: f64,
        vgo_radial: f64,
        vgo_cross: f64,
        radial_err_m: f64,
        cross_err_m: f64,
    ) {
        let integrals = self.burn_integrals(ve, tau, tgo);
        let l = integrals.l;
        let j = integrals.j;
        let s = l * tgo - integrals.j;
        let q = j * tgo - integrals.p;

        let det = l * q - j * s;
        if !det.is_finite() || det.abs() < 1e-9 {
            // Singular fit near cutoff: hold the previous coefficients.
            log::warn!("steering refit skipped, singular burn-integral matrix (det {det:.3e})");
            return;
        }

        // [L J; S Q] [A; B] = [Δv; Δx], one matrix for both channels.
        let a = (vgo_radial * q - j * radial_err_m) / det;
        let b = (l * radial_err_m - s * vgo_radial) / det;
        let c = (vgo_cross * q - j * cross_err_m) / det;
        let d = (l * cross_err_m - s * vgo_cross) / det;
        self.fit = Some(SteeringFit {
            a,
            b,
            c,
            d,
            fitted_at_s: time_s,
        });
        log::debug!(
            "steering refit at t={time_s:.1}s: tgo={tgo:.1}s A={a:.4} B={b:.6} C={c:.4} D={d:.6}"
        );
    }
}

impl GuidanceProgram for Igm {
    fn compute(
        &mut self,
        telemetry: &Telemetry,
        controller: &mut AttitudeController,
    ) -> Result<(), GuidanceError> {
        let ve = telemetry.exhaust_velocity_m_s;
        let accel = telemetry.thrust_accel_m_s2();
        if !ve.is_finite() || ve <= 0.0 {
            self.warning = true;
            return Err(GuidanceError::NumericRange {
                quantity: "exhaust velocity",
                value: ve,
            });
        }
        let tau = ve / accel;
        if !tau.is_finite() || tau <= 0.0 {
            self.warning = true;
            return Err(GuidanceError::NumericRange {
                quantity: "tau",
                value: tau,
            });
        }

        // Guidance frame: radial up, crossrange along the target plane
        // normal, downrange completing the right-handed set.
        let cross_unit = self.target.plane_normal;
        let downrange = vector::unit(&vector::cross(&cross_unit, &telemetry.state.position_km))
            .ok_or(GuidanceError::DegenerateDirection {
                reason: "position parallel to target plane normal",
            })?;
        let radial = vector::cross(&downrange, &cross_unit);

        // Velocity to be gained against a horizontal insertion at target
        // speed, in m/s per frame axis.
        let desired = vector::scale(&downrange, self.target.speed_km_s);
        let vgo_km_s = vector::sub(&desired, &telemetry.state.velocity_km_s);
        let vgo_radial = units::kms_to_ms(vector::dot(&vgo_km_s, &radial));
        let vgo_cross = units::kms_to_ms(vector::dot(&vgo_km_s, &cross_unit));
        let vgo = units::kms_to_ms(vector::norm(&vgo_km_s));

        let tgo = tau * (1.0 - (-vgo / ve).exp());
        if !tgo.is_finite() {
            self.warning = true;
            return Err(GuidanceError::NumericRange {
                quantity: "time to go",
                value: tgo,
            });
        }
        self.time_to_go_s = tgo;

        if vgo > VGO_FLOOR_M_S {
            let needs_refit = match &self.fit {
                Some(fit) => telemetry.time_s - fit.fitted_at_s >= REFIT_INTERVAL_S,
                None => true,
            };
            if needs_refit {
                let radius_m = units::km_to_m(telemetry.state.radius_km());
                let target_radius_m = units::km_to_m(self.target.radius_km);
                let vr_m_s =
                    units::kms_to_ms(vector::dot(&telemetry.state.velocity_km_s, &radial));
                let radial_err_m = target_radius_m - radius_m - vr_m_s * tgo;

                let cross_m = units::km_to_m(vector::dot(
                    &telemetry.state.position_km,
                    &cross_unit,
                ));
                let vy_m_s =
                    units::kms_to_ms(vector::dot(&telemetry.state.velocity_km_s, &cross_unit));
                let cross_err_m = -cross_m - vy_m_s * tgo;

                self.refit(
                    telemetry.time_s,
                    ve,
                    tau,
                    tgo,
                    vgo_radial,
                    vgo_cross,
                    radial_err_m,
                    cross_err_m,
                );
            }
        }

        let (sin_pitch, sin_yaw) = match &self.fit {
            Some(fit) => {
                let dt = telemetry.time_s - fit.fitted_at_s;
                (
                    (fit.a + fit.b * dt).clamp(-1.0, 1.0),
                    (fit.c + fit.d * dt).clamp(-1.0, 1.0),
                )
            }
            None => (0.0, 0.0),
        };
        let cos_pitch = (1.0 - sin_pitch * sin_pitch).sqrt();
        let cos_yaw = (1.0 - sin_yaw * sin_yaw).sqrt();

        let mut direction = vector::scale(&downrange, cos_pitch * cos_yaw);
        direction = vector::add(&direction, &vector::scale(&radial, sin_pitch));
        direction = vector::add(&direction, &vector::scale(&cross_unit, sin_yaw));
        let direction = vector::unit(&direction).ok_or(GuidanceError::DegenerateDirection {
            reason: "steering law produced a zero direction",
        })?;

        let throttle = match self.accel_limit_m_s2 {
            Some(a_lim) if accel > a_lim => (a_lim / accel).clamp(0.0, 1.0),
            _ => 1.0,
        };

        controller.set_target(direction, 0.0);
        controller.throttle = throttle;
        Ok(())
    }
}
