//! Closed-loop guidance programs.
//!
//! A program is invoked once per tick while its owning subsystem is active.
//! It reads telemetry and writes an attitude/throttle target into the
//! [`AttitudeController`]. Programs are idempotent for the same inputs;
//! cross-tick state exists only where the law demands it (the IGM feedback
//! coefficients, refit on a coarser cadence than the tick rate).

use orbital_core::StateVector;
use orbital_core::vector::Vector3;
use thiserror::Error;

pub mod approach;
pub mod attitude;
pub mod igm;

pub use approach::Approach;
pub use attitude::{AttitudeHold, RollPolicy, level_roll, heads_down_roll};
pub use igm::{Igm, TargetOrbit};

#[derive(Debug, Error)]
pub enum GuidanceError {
    /// A guidance quantity left the representable range (infinite tau,
    /// non-finite exhaust velocity). The previous target stays in effect.
    #[error("guidance quantity {quantity} is out of numeric range ({value})")]
    NumericRange { quantity: &'static str, value: f64 },
    #[error("guidance has no valid steering direction: {reason}")]
    DegenerateDirection { reason: &'static str },
}

/// Snapshot of vehicle telemetry for one tick.
#[derive(Debug, Clone, Copy)]
pub struct Telemetry {
    pub time_s: f64,
    pub state: StateVector,
    pub mass_kg: f64,
    pub thrust_n: f64,
    pub exhaust_velocity_m_s: f64,
    pub mu_km3_s2: f64,
}

impl Telemetry {
    /// Current thrust acceleration (m/s²).
    pub fn thrust_accel_m_s2(&self) -> f64 {
        self.thrust_n / self.mass_kg
    }
}

/// Target sink written by guidance and read by the attitude control loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttitudeController {
    /// Unit thrust/nose direction in the inertial frame. `None` until a
    /// program has produced one; a program skipping a tick leaves the
    /// previous target untouched.
    pub target_direction: Option<Vector3>,
    pub target_roll_rad: f64,
    /// Commanded throttle in [0, 1].
    pub throttle: f64,
}

impl AttitudeController {
    pub fn set_target(&mut self, direction: Vector3, roll_rad: f64) {
        self.target_direction = Some(direction);
        self.target_roll_rad = roll_rad;
    }
}

/// Capability interface every guidance program implements.
pub trait GuidanceProgram {
    fn compute(
        &mut self,
        telemetry: &Telemetry,
        controller: &mut AttitudeController,
    ) -> Result<(), GuidanceError>;
}
