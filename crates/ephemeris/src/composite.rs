//! Stitching several time-ranged ephemeris sources into one coverage window.

use std::cell::Cell;

use orbital_core::StateVector;

use crate::body::Body;
use crate::{Ephemeris, EphemerisError};

/// Spans must abut or overlap; any query prefers the span queried last, so
/// long forward-in-time simulations stay on one span until they cross its
/// boundary.
pub struct CompositeEphemeris {
    spans: Vec<Box<dyn Ephemeris>>,
    last_span: Cell<usize>,
}

impl CompositeEphemeris {
    /// Compose `spans` into one source. Fails on an empty list or if sorting
    /// by start time leaves a gap between consecutive spans.
    pub fn new(mut spans: Vec<Box<dyn Ephemeris>>) -> Result<Self, EphemerisError> {
        if spans.is_empty() {
            return Err(EphemerisError::Empty);
        }
        spans.sort_by(|a, b| a.start_jd().total_cmp(&b.start_jd()));
        for pair in spans.windows(2) {
            if pair[1].start_jd() > pair[0].end_jd() {
                return Err(EphemerisError::CoverageGap {
                    at_jd: pair[0].end_jd(),
                });
            }
        }
        Ok(Self {
            spans,
            last_span: Cell::new(0),
        })
    }

    fn span_covering(&self, jd: f64) -> Option<usize> {
        let last = self.last_span.get();
        if let Some(span) = self.spans.get(last) {
            if jd >= span.start_jd() && jd < span.end_jd() {
                return Some(last);
            }
        }
        let found = self
            .spans
            .iter()
            .position(|span| jd >= span.start_jd() && jd < span.end_jd())?;
        self.last_span.set(found);
        Some(found)
    }
}

impl Ephemeris for CompositeEphemeris {
    fn bodies_supported(&self) -> u32 {
        // Only bodies every span can answer for are advertised.
        self.spans
            .iter()
            .fold(u32::MAX, |mask, span| mask & span.bodies_supported())
    }

    fn start_jd(&self) -> f64 {
        self.spans[0].start_jd()
    }

    fn end_jd(&self) -> f64 {
        self.spans
            .iter()
            .map(|span| span.end_jd())
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn body_state_vector(&self, body: Body, jd: f64) -> Result<StateVector, EphemerisError> {
        let index = self
            .span_covering(jd)
            .ok_or(EphemerisError::TimeOutOfRange {
                jd,
                start_jd: self.start_jd(),
                end_jd: self.end_jd(),
            })?;
        self.spans[index].body_state_vector(body, jd)
    }
}
