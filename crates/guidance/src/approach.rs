//! Terminal approach guidance.
//!
//! Steers along the line of sight to a target state and brakes when the
//! closing speed exceeds what the configured deceleration can shed over the
//! remaining range.

use orbital_core::StateVector;
use orbital_core::units;
use orbital_core::vector;

use crate::{AttitudeController, GuidanceError, GuidanceProgram, Telemetry};

pub struct Approach {
    target: StateVector,
    braking_accel_m_s2: f64,
    /// Range below which the program cuts thrust and releases steering.
    stop_range_km: f64,
}

impl Approach {
    pub fn new(target: StateVector, braking_accel_m_s2: f64) -> Self {
        Self {
            target,
            braking_accel_m_s2,
            stop_range_km: 0.0,
        }
    }

    pub fn with_stop_range(mut self, stop_range_km: f64) -> Self {
        self.stop_range_km = stop_range_km;
        self
    }

    /// Retarget mid-approach, e.g. when the chase target moves.
    pub fn set_target(&mut self, target: StateVector) {
        self.target = target;
    }

    /// Highest closing speed (m/s) the braking budget can null over `range_m`.
    fn allowed_speed_m_s(&self, range_m: f64) -> f64 {
        (2.0 * self.braking_accel_m_s2 * range_m).sqrt()
    }
}

impl GuidanceProgram for Approach {
    fn compute(
        &mut self,
        telemetry: &Telemetry,
        controller: &mut AttitudeController,
    ) -> Result<(), GuidanceError> {
        let separation_km = vector::sub(&self.target.position_km, &telemetry.state.position_km);
        let range_km = vector::norm(&separation_km);
        if range_km <= self.stop_range_km {
            controller.throttle = 0.0;
            return Ok(());
        }
        let los = vector::unit(&separation_km).ok_or(GuidanceError::DegenerateDirection {
            reason: "zero range to approach target",
        })?;

        let relative_v_km_s =
            vector::sub(&telemetry.state.velocity_km_s, &self.target.velocity_km_s);
        let closing_m_s = units::kms_to_ms(vector::dot(&relative_v_km_s, &los));
        let allowed_m_s = self.allowed_speed_m_s(units::km_to_m(range_km));

        if closing_m_s > allowed_m_s {
            // Braking: thrust against the relative velocity at full power.
            let retro = vector::unit(&vector::scale(&relative_v_km_s, -1.0)).ok_or(
                GuidanceError::DegenerateDirection {
                    reason: "zero relative velocity while over the braking envelope",
                },
            )?;
            controller.set_target(retro, 0.0);
            controller.throttle = 1.0;
        } else {
            // Inside the envelope: coast pointed down the line of sight.
            controller.set_target(los, 0.0);
            controller.throttle = 0.0;
        }
        Ok(())
    }
}
