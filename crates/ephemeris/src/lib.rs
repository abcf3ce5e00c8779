//! Ephemeris subsystem: maps (body, Julian time) to barycentric state
//! vectors by evaluating precomputed Chebyshev coefficient tables.
//!
//! The concrete table type is [`ChebyshevEphemeris`]; [`CompositeEphemeris`]
//! stitches several time-ranged tables into one continuous range, and
//! [`ProxyEphemeris`] defers loading the backing blob until the first query.
//! All of it is wired together once at startup into an [`EphemerisContext`]
//! that consumers hold by reference; there is no global state.
//!
//! The whole subsystem assumes the single simulation thread: the lazy load
//! and the one-step query cache use `RefCell`/`OnceCell` and the types are
//! deliberately `!Sync`. A multi-threaded port must add locking here.

use std::path::{Path, PathBuf};

use orbital_core::StateVector;
use thiserror::Error;

pub mod blob;
pub mod body;
pub mod chebyshev;
pub mod composite;
pub mod proxy;

pub use body::{Body, SERIES_LAYOUT, SeriesLayout};
pub use chebyshev::ChebyshevEphemeris;
pub use composite::CompositeEphemeris;
pub use proxy::{ProxyEphemeris, SpanDescriptor};

/// Errors surfaced while loading or querying ephemeris data.
#[derive(Debug, Error)]
pub enum EphemerisError {
    #[error("julian time {jd} outside ephemeris coverage [{start_jd}, {end_jd})")]
    TimeOutOfRange { jd: f64, start_jd: f64, end_jd: f64 },
    #[error("body {body:?} is not supported by this ephemeris")]
    BodyNotSupported { body: Body },
    #[error("ephemeris blob is missing at {path}")]
    MissingBlob { path: PathBuf },
    #[error("failed to read ephemeris blob {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed ephemeris blob {path}: {reason}")]
    MalformedBlob { path: PathBuf, reason: String },
    #[error("blob {path} covers [{got_start}, {got_end}) but the catalog declares [{want_start}, {want_end})")]
    CoverageMismatch {
        path: PathBuf,
        got_start: f64,
        got_end: f64,
        want_start: f64,
        want_end: f64,
    },
    #[error("composite spans leave a coverage gap at JD {at_jd}")]
    CoverageGap { at_jd: f64 },
    #[error("composite requires at least one span")]
    Empty,
}

/// Read-only ephemeris query interface shared by tables, composites, and
/// proxies.
pub trait Ephemeris {
    /// Bitmask of [`Body`] indices this source can answer for.
    fn bodies_supported(&self) -> u32;

    /// First Julian date covered (inclusive).
    fn start_jd(&self) -> f64;

    /// First Julian date no longer covered (exclusive).
    fn end_jd(&self) -> f64;

    /// Barycentric state vector of `body` at `jd` (km, km/s).
    ///
    /// Fails with [`EphemerisError::TimeOutOfRange`] outside
    /// `[start_jd, end_jd)` and [`EphemerisError::BodyNotSupported`] for
    /// bodies missing from the support mask; never clamps.
    fn body_state_vector(&self, body: Body, jd: f64) -> Result<StateVector, EphemerisError>;

    /// Whether `body` is in the support mask.
    fn supports(&self, body: Body) -> bool {
        self.bodies_supported() & body.mask() != 0
    }
}

/// Startup-constructed context owning the composed ephemeris sources.
///
/// Construct one of these once and pass it by reference to every consumer;
/// there is no global table.
pub struct EphemerisContext {
    composite: CompositeEphemeris,
}

impl EphemerisContext {
    /// Build the context from span descriptors resolved against `base_dir`.
    /// Blob files are not opened here; each span loads on its first query.
    pub fn from_catalog(
        base_dir: &Path,
        catalog: &[SpanDescriptor],
    ) -> Result<Self, EphemerisError> {
        let spans: Vec<Box<dyn Ephemeris>> = catalog
            .iter()
            .map(|descriptor| {
                Box::new(ProxyEphemeris::new(base_dir, descriptor.clone())) as Box<dyn Ephemeris>
            })
            .collect();
        Ok(Self {
            composite: CompositeEphemeris::new(spans)?,
        })
    }

    /// Wrap an already-composed set of sources.
    pub fn from_composite(composite: CompositeEphemeris) -> Self {
        Self { composite }
    }

    /// The composed ephemeris for direct queries.
    pub fn ephemeris(&self) -> &dyn Ephemeris {
        &self.composite
    }
}
