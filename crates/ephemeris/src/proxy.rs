//! Lazy-loading span proxy: defers reading a blob file until the first query.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use orbital_core::StateVector;

use crate::blob::EphemerisBlob;
use crate::body::Body;
use crate::chebyshev::ChebyshevEphemeris;
use crate::{Ephemeris, EphemerisError};

/// Catalog entry describing one blob file and the coverage it promises.
#[derive(Debug, Clone)]
pub struct SpanDescriptor {
    /// Blob filename, resolved relative to the catalog's base directory.
    pub filename: String,
    pub start_jd: f64,
    pub end_jd: f64,
}

/// Ephemeris that answers range/support queries from its descriptor alone
/// and loads the backing blob on the first state-vector query.
///
/// A load failure is returned from that query, and every later query repeats
/// the attempt against the unchanged file, so the error is stable.
pub struct ProxyEphemeris {
    path: PathBuf,
    descriptor: SpanDescriptor,
    loaded: OnceCell<ChebyshevEphemeris>,
}

impl ProxyEphemeris {
    pub fn new(base_dir: &Path, descriptor: SpanDescriptor) -> Self {
        Self {
            path: base_dir.join(&descriptor.filename),
            descriptor,
            loaded: OnceCell::new(),
        }
    }

    fn table(&self) -> Result<&ChebyshevEphemeris, EphemerisError> {
        if let Some(table) = self.loaded.get() {
            return Ok(table);
        }
        let blob = EphemerisBlob::load(&self.path)?;
        let table = ChebyshevEphemeris::new(blob);
        // The file must deliver the coverage the catalog promised.
        if table.start_jd() > self.descriptor.start_jd
            || table.end_jd() < self.descriptor.end_jd
        {
            return Err(EphemerisError::CoverageMismatch {
                path: self.path.clone(),
                got_start: table.start_jd(),
                got_end: table.end_jd(),
                want_start: self.descriptor.start_jd,
                want_end: self.descriptor.end_jd,
            });
        }
        Ok(self.loaded.get_or_init(|| table))
    }
}

impl Ephemeris for ProxyEphemeris {
    fn bodies_supported(&self) -> u32 {
        crate::body::full_support_mask()
    }

    fn start_jd(&self) -> f64 {
        self.descriptor.start_jd
    }

    fn end_jd(&self) -> f64 {
        self.descriptor.end_jd
    }

    fn body_state_vector(&self, body: Body, jd: f64) -> Result<StateVector, EphemerisError> {
        // Range checks use the catalog coverage, not the (possibly wider)
        // blob coverage, so composites behave identically before and after
        // the lazy load.
        if jd < self.descriptor.start_jd || jd >= self.descriptor.end_jd {
            return Err(EphemerisError::TimeOutOfRange {
                jd,
                start_jd: self.descriptor.start_jd,
                end_jd: self.descriptor.end_jd,
            });
        }
        self.table()?.body_state_vector(body, jd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::BlobBuilder;

    #[test]
    fn missing_blob_fails_on_query_not_construction() {
        let proxy = ProxyEphemeris::new(
            Path::new("/nonexistent"),
            SpanDescriptor {
                filename: "span.bin".into(),
                start_jd: 100.0,
                end_jd: 132.0,
            },
        );
        assert_eq!(proxy.start_jd(), 100.0);
        let err = proxy.body_state_vector(Body::Mars, 110.0);
        assert!(matches!(err, Err(EphemerisError::MissingBlob { .. })));
    }

    #[test]
    fn coverage_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blob = {
            let mut builder = BlobBuilder::new(100.0);
            builder.push_interval();
            builder.build()
        };
        std::fs::write(dir.path().join("span.bin"), blob.to_bytes()).unwrap();

        let proxy = ProxyEphemeris::new(
            dir.path(),
            SpanDescriptor {
                filename: "span.bin".into(),
                start_jd: 100.0,
                end_jd: 164.0,
            },
        );
        let err = proxy.body_state_vector(Body::Mars, 110.0);
        assert!(matches!(err, Err(EphemerisError::CoverageMismatch { .. })));
    }
}
