//! Transfer planning: the Lambert boundary-value solver and the iterative
//! departure/time-of-flight window search built on top of it.

use thiserror::Error;

pub mod lambert;
pub mod window;

pub use lambert::{LambertSolution, TransferPath, solve as solve_lambert};
pub use window::{
    SearchBounds, SearchSettings, SearchStatus, StateSource, TransferSample, TransferSearch,
    WindowDataset, WindowError, sample_point,
};

/// Failures of the targeting/navigation layer.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("time of flight must be positive, got {tof_s}s")]
    InvalidTimeOfFlight { tof_s: f64 },
    #[error("transfer geometry is degenerate: {reason}")]
    DegenerateGeometry { reason: &'static str },
    #[error("lambert iteration failed to converge after {iterations} iterations (residual {residual_s}s)")]
    NonConvergence { iterations: usize, residual_s: f64 },
    #[error("transfer orbit construction failed: {0}")]
    Conic(#[from] orbital_kepler::ConicError),
    #[error("state source has no state at t={time_s}s")]
    StateUnavailable { time_s: f64 },
}
