//! Attitude hold composed from a direction policy and a roll policy.

use orbital_core::vector::{self, Vector3};

use crate::{AttitudeController, GuidanceError, GuidanceProgram, Telemetry};

/// Computes the commanded roll for the current telemetry. Supplying a policy
/// function composes with the shared attitude-solving routine instead of
/// specializing it per vehicle.
pub type RollPolicy = fn(&Telemetry) -> f64;

/// Wings-level roll.
pub fn level_roll(_telemetry: &Telemetry) -> f64 {
    0.0
}

/// Heads-down roll used during early ascent.
pub fn heads_down_roll(_telemetry: &Telemetry) -> f64 {
    std::f64::consts::PI
}

/// Holds a direction derived from telemetry, with roll supplied separately.
pub struct AttitudeHold {
    direction: DirectionPolicy,
    roll: RollPolicy,
}

enum DirectionPolicy {
    Fixed(Vector3),
    Prograde,
    Retrograde,
    Radial,
}

impl AttitudeHold {
    pub fn fixed(direction: Vector3, roll: RollPolicy) -> Self {
        Self {
            direction: DirectionPolicy::Fixed(direction),
            roll,
        }
    }

    pub fn prograde(roll: RollPolicy) -> Self {
        Self {
            direction: DirectionPolicy::Prograde,
            roll,
        }
    }

    pub fn retrograde(roll: RollPolicy) -> Self {
        Self {
            direction: DirectionPolicy::Retrograde,
            roll,
        }
    }

    pub fn radial(roll: RollPolicy) -> Self {
        Self {
            direction: DirectionPolicy::Radial,
            roll,
        }
    }

    fn direction(&self, telemetry: &Telemetry) -> Result<Vector3, GuidanceError> {
        let raw = match &self.direction {
            DirectionPolicy::Fixed(v) => *v,
            DirectionPolicy::Prograde => telemetry.state.velocity_km_s,
            DirectionPolicy::Retrograde => vector::scale(&telemetry.state.velocity_km_s, -1.0),
            DirectionPolicy::Radial => telemetry.state.position_km,
        };
        vector::unit(&raw).ok_or(GuidanceError::DegenerateDirection {
            reason: "zero-length reference vector",
        })
    }
}

impl GuidanceProgram for AttitudeHold {
    fn compute(
        &mut self,
        telemetry: &Telemetry,
        controller: &mut AttitudeController,
    ) -> Result<(), GuidanceError> {
        let direction = self.direction(telemetry)?;
        controller.set_target(direction, (self.roll)(telemetry));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbital_core::StateVector;
    use orbital_core::constants::MU_EARTH;

    fn telemetry() -> Telemetry {
        Telemetry {
            time_s: 0.0,
            state: StateVector::new([7_000.0, 0.0, 0.0], [0.0, 7.5, 0.0]),
            mass_kg: 10_000.0,
            thrust_n: 100_000.0,
            exhaust_velocity_m_s: 3_000.0,
            mu_km3_s2: MU_EARTH,
        }
    }

    #[test]
    fn prograde_hold_points_along_velocity() {
        let mut hold = AttitudeHold::prograde(level_roll);
        let mut controller = AttitudeController::default();
        hold.compute(&telemetry(), &mut controller).unwrap();
        let dir = controller.target_direction.unwrap();
        assert!((dir[1] - 1.0).abs() < 1e-12);
        assert_eq!(controller.target_roll_rad, 0.0);
    }

    #[test]
    fn zero_velocity_prograde_is_an_error_and_keeps_old_target() {
        let mut hold = AttitudeHold::prograde(heads_down_roll);
        let mut controller = AttitudeController::default();
        controller.set_target([1.0, 0.0, 0.0], 0.5);

        let mut t = telemetry();
        t.state.velocity_km_s = [0.0, 0.0, 0.0];
        assert!(hold.compute(&t, &mut controller).is_err());
        assert_eq!(controller.target_direction, Some([1.0, 0.0, 0.0]));
    }
}
