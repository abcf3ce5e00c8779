//! Adaptive fourth-order Runge-Kutta propagation of state vectors.
//!
//! The integrator advances a [`StateVector`] under an [`AccelerationModel`]
//! until a caller-supplied termination predicate fires. Step size adapts via
//! step doubling: one full step is compared against two half steps and the
//! Richardson-extrapolated half-step result is kept when the difference is
//! within tolerance.

use orbital_core::vector::{self, Vector3};
use orbital_core::{StateVector, units};
use thiserror::Error;

pub mod atmosphere;

pub use atmosphere::{ExponentialAtmosphere, MACH_RECOMPUTE_THRESHOLD, MachDragTable};

#[derive(Debug, Error)]
pub enum PropagationError {
    /// The step cap was hit before the termination predicate fired. The
    /// partial result is carried so callers can inspect how far it got.
    #[error("step limit of {steps} reached at t={time_s}s without termination")]
    StepLimit {
        steps: usize,
        time_s: f64,
        state: StateVector,
    },
    #[error("step bounds are invalid: min {min_step_s}s, max {max_step_s}s")]
    InvalidStepBounds { min_step_s: f64, max_step_s: f64 },
}

/// Acceleration as a function of time and instantaneous state (km/s²).
///
/// Takes `&mut self` so models may keep evaluation caches.
pub trait AccelerationModel {
    fn acceleration_km_s2(
        &mut self,
        time_s: f64,
        position_km: &Vector3,
        velocity_km_s: &Vector3,
    ) -> Vector3;
}

/// Two-body point-mass gravity, -mu·r/|r|³.
#[derive(Debug, Clone)]
pub struct PointMassGravity {
    pub mu_km3_s2: f64,
}

impl AccelerationModel for PointMassGravity {
    fn acceleration_km_s2(
        &mut self,
        _time_s: f64,
        position_km: &Vector3,
        _velocity_km_s: &Vector3,
    ) -> Vector3 {
        let r = vector::norm(position_km);
        vector::scale(position_km, -self.mu_km3_s2 / (r * r * r))
    }
}

/// Point-mass gravity plus aerodynamic drag (and optional lift) from an
/// exponential atmosphere.
///
/// The drag coefficient comes from a Mach-keyed table but is only recomputed
/// when Mach has moved by more than [`MACH_RECOMPUTE_THRESHOLD`] since the
/// last lookup; RK4 evaluates the model four times per step at nearly the
/// same airspeed, so the cache removes most table walks.
pub struct GravityWithDrag {
    pub gravity: PointMassGravity,
    pub atmosphere: ExponentialAtmosphere,
    pub drag_table: MachDragTable,
    /// Mass over drag area (kg/m²). Larger punches through the atmosphere.
    pub ballistic_coefficient_kg_m2: f64,
    pub lift_to_drag: Option<f64>,
    cached_mach: Option<f64>,
    cached_cd: f64,
}

impl GravityWithDrag {
    pub fn new(
        gravity: PointMassGravity,
        atmosphere: ExponentialAtmosphere,
        drag_table: MachDragTable,
        ballistic_coefficient_kg_m2: f64,
        lift_to_drag: Option<f64>,
    ) -> Self {
        Self {
            gravity,
            atmosphere,
            drag_table,
            ballistic_coefficient_kg_m2,
            lift_to_drag,
            cached_mach: None,
            cached_cd: 0.0,
        }
    }

    fn drag_coefficient(&mut self, mach: f64) -> f64 {
        let stale = match self.cached_mach {
            Some(last) => (mach - last).abs() > MACH_RECOMPUTE_THRESHOLD,
            None => true,
        };
        if stale {
            self.cached_cd = self.drag_table.coefficient_at(mach);
            self.cached_mach = Some(mach);
        }
        self.cached_cd
    }
}

impl AccelerationModel for GravityWithDrag {
    fn acceleration_km_s2(
        &mut self,
        time_s: f64,
        position_km: &Vector3,
        velocity_km_s: &Vector3,
    ) -> Vector3 {
        let mut total = self
            .gravity
            .acceleration_km_s2(time_s, position_km, velocity_km_s);

        let density = self.atmosphere.density_at(vector::norm(position_km));
        if density <= 0.0 || self.ballistic_coefficient_kg_m2 <= 0.0 {
            return total;
        }

        let airmass = self.atmosphere.airmass_velocity_km_s(position_km);
        let relative_km_s = vector::sub(velocity_km_s, &airmass);
        let airspeed_km_s = vector::norm(&relative_km_s);
        if airspeed_km_s == 0.0 {
            return total;
        }

        let mach = airspeed_km_s / self.atmosphere.speed_of_sound_km_s;
        let cd = self.drag_coefficient(mach);

        // Dynamic pressure over ballistic coefficient, SI then back to km/s².
        let airspeed_m_s = units::kms_to_ms(airspeed_km_s);
        let drag_m_s2 =
            0.5 * density * airspeed_m_s * airspeed_m_s * cd / self.ballistic_coefficient_kg_m2;
        let drag_km_s2 = units::ms_to_kms(drag_m_s2);

        let against_airflow = vector::scale(&relative_km_s, -drag_km_s2 / airspeed_km_s);
        total = vector::add(&total, &against_airflow);

        if let Some(ld) = self.lift_to_drag {
            // Lift acts perpendicular to the airflow, in the vertical plane:
            // radial direction with the along-flow component removed.
            if let Some(radial) = vector::unit(position_km) {
                let flow = vector::scale(&relative_km_s, 1.0 / airspeed_km_s);
                let off_axis =
                    vector::sub(&radial, &vector::scale(&flow, vector::dot(&radial, &flow)));
                if let Some(lift_dir) = vector::unit(&off_axis) {
                    total = vector::add(&total, &vector::scale(&lift_dir, ld * drag_km_s2));
                }
            }
        }
        total
    }
}

/// State reached by a finished propagation.
#[derive(Debug, Clone, Copy)]
pub struct Propagated {
    pub time_s: f64,
    pub state: StateVector,
    pub steps: usize,
}

/// Adaptive RK4 integrator with step doubling and Richardson extrapolation.
#[derive(Debug, Clone)]
pub struct RungeKutta4 {
    pub min_step_s: f64,
    pub max_step_s: f64,
    /// Fraction of the error-optimal step actually taken.
    pub safety: f64,
    pub max_growth: f64,
    pub max_shrink: f64,
    /// Accepted local error per step, in km / km/s.
    pub tolerance: f64,
    pub max_steps: usize,
}

impl Default for RungeKutta4 {
    fn default() -> Self {
        Self {
            min_step_s: 0.1,
            max_step_s: 300.0,
            safety: 0.9,
            max_growth: 5.0,
            max_shrink: 0.2,
            tolerance: 1e-8,
            max_steps: 200_000,
        }
    }
}

impl RungeKutta4 {
    /// Single classical RK4 step of size `dt`.
    pub fn step(
        &self,
        model: &mut dyn AccelerationModel,
        time_s: f64,
        state: &StateVector,
        dt: f64,
    ) -> StateVector {
        let a1 = model.acceleration_km_s2(time_s, &state.position_km, &state.velocity_km_s);
        let v1 = state.velocity_km_s;

        let half = dt / 2.0;
        let p2 = vector::add(&state.position_km, &vector::scale(&v1, half));
        let v2 = vector::add(&state.velocity_km_s, &vector::scale(&a1, half));
        let a2 = model.acceleration_km_s2(time_s + half, &p2, &v2);

        let p3 = vector::add(&state.position_km, &vector::scale(&v2, half));
        let v3 = vector::add(&state.velocity_km_s, &vector::scale(&a2, half));
        let a3 = model.acceleration_km_s2(time_s + half, &p3, &v3);

        let p4 = vector::add(&state.position_km, &vector::scale(&v3, dt));
        let v4 = vector::add(&state.velocity_km_s, &vector::scale(&a3, dt));
        let a4 = model.acceleration_km_s2(time_s + dt, &p4, &v4);

        let dp = vector::scale(
            &vector::add(
                &vector::add(&v1, &vector::scale(&v2, 2.0)),
                &vector::add(&vector::scale(&v3, 2.0), &v4),
            ),
            dt / 6.0,
        );
        let dv = vector::scale(
            &vector::add(
                &vector::add(&a1, &vector::scale(&a2, 2.0)),
                &vector::add(&vector::scale(&a3, 2.0), &a4),
            ),
            dt / 6.0,
        );
        StateVector::new(
            vector::add(&state.position_km, &dp),
            vector::add(&state.velocity_km_s, &dv),
        )
    }

    /// One accepted adaptive step. Returns the new state, the step actually
    /// taken, and a suggestion for the next step.
    fn adaptive_step(
        &self,
        model: &mut dyn AccelerationModel,
        time_s: f64,
        state: &StateVector,
        dt_suggested: f64,
    ) -> (StateVector, f64, f64) {
        let mut h = dt_suggested.clamp(self.min_step_s, self.max_step_s);
        loop {
            let full = self.step(model, time_s, state, h);
            let half1 = self.step(model, time_s, state, h / 2.0);
            let half2 = self.step(model, time_s + h / 2.0, &half1, h / 2.0);

            let err_pos = vector::norm(&vector::sub(&full.position_km, &half2.position_km));
            let err_vel = vector::norm(&vector::sub(&full.velocity_km_s, &half2.velocity_km_s));
            let error = err_pos.max(err_vel);

            if error < self.tolerance || h <= self.min_step_s {
                // Richardson extrapolation: (16·y_half − y_full) / 15.
                let position_km = vector::scale(
                    &vector::sub(&vector::scale(&half2.position_km, 16.0), &full.position_km),
                    1.0 / 15.0,
                );
                let velocity_km_s = vector::scale(
                    &vector::sub(
                        &vector::scale(&half2.velocity_km_s, 16.0),
                        &full.velocity_km_s,
                    ),
                    1.0 / 15.0,
                );
                let next = if error > 0.0 {
                    let factor = self.safety * (self.tolerance / error).powf(0.2);
                    (h * factor.clamp(self.max_shrink, self.max_growth))
                        .clamp(self.min_step_s, self.max_step_s)
                } else {
                    (h * self.max_growth).min(self.max_step_s)
                };
                return (StateVector::new(position_km, velocity_km_s), h, next);
            }

            let factor = self.safety * (self.tolerance / error).powf(0.2);
            h = (h * factor.clamp(self.max_shrink, 1.0)).max(self.min_step_s);
        }
    }

    /// Advance `state` from `start_time_s` until `terminate(time, state)`
    /// returns true. The predicate is checked after every accepted step;
    /// hitting the step cap first is an error carrying the partial result.
    pub fn propagate_until(
        &self,
        model: &mut dyn AccelerationModel,
        start_time_s: f64,
        state: &StateVector,
        terminate: &mut dyn FnMut(f64, &StateVector) -> bool,
    ) -> Result<Propagated, PropagationError> {
        if !(self.min_step_s > 0.0 && self.max_step_s >= self.min_step_s) {
            return Err(PropagationError::InvalidStepBounds {
                min_step_s: self.min_step_s,
                max_step_s: self.max_step_s,
            });
        }

        let mut current = *state;
        let mut time_s = start_time_s;
        let mut dt = self.max_step_s.min(self.min_step_s * 100.0);

        for step in 0..self.max_steps {
            if terminate(time_s, &current) {
                return Ok(Propagated {
                    time_s,
                    state: current,
                    steps: step,
                });
            }
            let (next, taken, suggestion) = self.adaptive_step(model, time_s, &current, dt);
            current = next;
            time_s += taken;
            dt = suggestion;
        }

        if terminate(time_s, &current) {
            return Ok(Propagated {
                time_s,
                state: current,
                steps: self.max_steps,
            });
        }
        log::warn!(
            "propagation still running after {} steps (t={time_s:.1}s)",
            self.max_steps
        );
        Err(PropagationError::StepLimit {
            steps: self.max_steps,
            time_s,
            state: current,
        })
    }

    /// Advance by a fixed duration.
    pub fn propagate_for(
        &self,
        model: &mut dyn AccelerationModel,
        start_time_s: f64,
        state: &StateVector,
        duration_s: f64,
    ) -> Result<Propagated, PropagationError> {
        let end = start_time_s + duration_s;
        self.propagate_until(model, start_time_s, state, &mut |t, _| t >= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbital_core::constants::MU_EARTH;

    #[test]
    fn circular_orbit_radius_is_preserved_over_one_step() {
        let r = 6_771.0;
        let v = (MU_EARTH / r).sqrt();
        let state = StateVector::new([r, 0.0, 0.0], [0.0, v, 0.0]);
        let mut gravity = PointMassGravity { mu_km3_s2: MU_EARTH };
        let integrator = RungeKutta4::default();

        let after = integrator.step(&mut gravity, 0.0, &state, 60.0);
        assert!((after.radius_km() - r).abs() / r < 1e-6);
        assert!((after.speed_km_s() - v).abs() / v < 1e-6);
    }

    #[test]
    fn step_limit_is_an_error_not_a_truncation() {
        let r = 6_771.0;
        let v = (MU_EARTH / r).sqrt();
        let state = StateVector::new([r, 0.0, 0.0], [0.0, v, 0.0]);
        let mut gravity = PointMassGravity { mu_km3_s2: MU_EARTH };
        let integrator = RungeKutta4 {
            max_steps: 5,
            ..RungeKutta4::default()
        };

        let result =
            integrator.propagate_until(&mut gravity, 0.0, &state, &mut |_, _| false);
        assert!(matches!(result, Err(PropagationError::StepLimit { .. })));
    }
}
