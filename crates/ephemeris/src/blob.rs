//! Reading and writing ephemeris coefficient blobs.
//!
//! A blob is a flat list of little-endian f64 values: a two-double preamble
//! (`start_jd`, interval count) followed by one record per 32-day interval.
//! The record layout comes from [`SERIES_LAYOUT`](crate::body::SERIES_LAYOUT),
//! not from the file itself.

use std::fs;
use std::path::Path;

use crate::EphemerisError;
use crate::body::{self, INTERVAL_DAYS, SeriesLayout};

/// Decoded contents of a coefficient blob.
#[derive(Debug, Clone)]
pub struct EphemerisBlob {
    pub start_jd: f64,
    pub interval_count: usize,
    /// Concatenated interval records.
    pub coefficients: Vec<f64>,
}

impl EphemerisBlob {
    /// Last Julian date covered by the blob.
    pub fn end_jd(&self) -> f64 {
        self.start_jd + self.interval_count as f64 * INTERVAL_DAYS
    }

    /// Slice holding one interval's record.
    pub fn record(&self, interval: usize) -> &[f64] {
        let len = body::record_doubles();
        &self.coefficients[interval * len..(interval + 1) * len]
    }

    /// Decode a blob from raw file bytes.
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self, EphemerisError> {
        let malformed = |reason: &str| EphemerisError::MalformedBlob {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if bytes.len() % 8 != 0 {
            return Err(malformed("length is not a multiple of 8 bytes"));
        }
        let mut doubles = Vec::with_capacity(bytes.len() / 8);
        for chunk in bytes.chunks_exact(8) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            doubles.push(f64::from_le_bytes(raw));
        }
        if doubles.len() < 2 {
            return Err(malformed("missing preamble"));
        }

        let start_jd = doubles[0];
        let count_raw = doubles[1];
        if !start_jd.is_finite() || !count_raw.is_finite() || count_raw < 1.0 {
            return Err(malformed("invalid preamble values"));
        }
        let interval_count = count_raw as usize;

        let expected = 2 + interval_count * body::record_doubles();
        if doubles.len() != expected {
            return Err(malformed("coefficient payload does not match interval count"));
        }

        Ok(Self {
            start_jd,
            interval_count,
            coefficients: doubles.split_off(2),
        })
    }

    /// Read and decode a blob file.
    pub fn load(path: &Path) -> Result<Self, EphemerisError> {
        if !path.exists() {
            return Err(EphemerisError::MissingBlob { path: path.to_path_buf() });
        }
        let bytes = fs::read(path).map_err(|source| EphemerisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(path, &bytes)
    }

    /// Encode back into the on-disk byte layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 * (2 + self.coefficients.len()));
        out.extend_from_slice(&self.start_jd.to_le_bytes());
        out.extend_from_slice(&(self.interval_count as f64).to_le_bytes());
        for value in &self.coefficients {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }
}

/// Builder for assembling interval records, mainly for generated datasets
/// and tests.
pub struct BlobBuilder {
    start_jd: f64,
    records: Vec<Vec<f64>>,
}

impl BlobBuilder {
    pub fn new(start_jd: f64) -> Self {
        Self { start_jd, records: Vec::new() }
    }

    /// Append an empty (all-zero) interval record and return its index.
    pub fn push_interval(&mut self) -> usize {
        self.records.push(vec![0.0; body::record_doubles()]);
        self.records.len() - 1
    }

    /// Write one granule's per-axis coefficient sets into an interval record.
    ///
    /// `axes` holds three coefficient slices (x, y, z), each of the body's
    /// `coeff_count` length.
    pub fn set_granule(
        &mut self,
        interval: usize,
        layout: &SeriesLayout,
        granule: usize,
        axes: [&[f64]; 3],
    ) {
        let (offset, _) = body::series_offset(layout.body)
            .unwrap_or_else(|| panic!("{:?} has no stored series", layout.body));
        let record = &mut self.records[interval];
        let granule_len = 3 * layout.coeff_count;
        let base = offset + granule * granule_len;
        for (axis, coeffs) in axes.iter().enumerate() {
            assert_eq!(coeffs.len(), layout.coeff_count);
            let axis_base = base + axis * layout.coeff_count;
            record[axis_base..axis_base + layout.coeff_count].copy_from_slice(coeffs);
        }
    }

    pub fn build(self) -> EphemerisBlob {
        let interval_count = self.records.len();
        let coefficients = self.records.into_iter().flatten().collect();
        EphemerisBlob {
            start_jd: self.start_jd,
            interval_count,
            coefficients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, SERIES_LAYOUT};

    #[test]
    fn round_trips_through_bytes() {
        let mut builder = BlobBuilder::new(2_451_545.0);
        let interval = builder.push_interval();
        let layout = SERIES_LAYOUT
            .iter()
            .find(|l| l.body == Body::Mars)
            .unwrap();
        let coeffs = vec![1.5; layout.coeff_count];
        builder.set_granule(interval, layout, 0, [&coeffs, &coeffs, &coeffs]);
        let blob = builder.build();

        let bytes = blob.to_bytes();
        let decoded = EphemerisBlob::from_bytes(Path::new("mem"), &bytes).unwrap();
        assert_eq!(decoded.start_jd, blob.start_jd);
        assert_eq!(decoded.interval_count, 1);
        assert_eq!(decoded.coefficients, blob.coefficients);
    }

    #[test]
    fn rejects_truncated_payload() {
        let blob = BlobBuilder::new(2_451_545.0).build();
        let err = EphemerisBlob::from_bytes(Path::new("mem"), &blob.to_bytes());
        assert!(matches!(err, Err(EphemerisError::MalformedBlob { .. })));
    }
}
