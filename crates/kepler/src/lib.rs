//! Two-body orbit representation: Kepler equation solvers, classical orbital
//! elements, and the `Conic` propagation model.

pub mod anomaly;
pub mod conic;
pub mod elements;

pub use anomaly::{ConvergenceError, anomaly_to_mean, solve as solve_kepler};
pub use conic::{Conic, ConicError};
pub use elements::KeplerianElements;
