//! Orbital mechanics and mission sequencing engine.
//!
//! This facade re-exports the workspace member crates under short module
//! names so front-ends can depend on a single crate. The math and the
//! sequencing logic live in the members; keeping them in library crates lets
//! multiple front-ends (CLI, simulation harnesses) share them.

pub use orbital_config as config;
pub use orbital_core as core;
pub use orbital_ephemeris as ephemeris;
pub use orbital_guidance as guidance;
pub use orbital_kepler as kepler;
pub use orbital_propagate as propagate;
pub use orbital_sequencer as sequencer;
pub use orbital_transfer as transfer;

/// Returns the version of the engine for smoke tests.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
