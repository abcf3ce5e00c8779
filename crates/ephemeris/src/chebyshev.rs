//! Chebyshev evaluation over a single coefficient blob.

use std::cell::RefCell;

use orbital_core::constants::{EARTH_MOON_MASS_RATIO, SECONDS_PER_DAY};
use orbital_core::{StateVector, vector};

use crate::blob::EphemerisBlob;
use crate::body::{self, Body, INTERVAL_DAYS, SeriesLayout};
use crate::{Ephemeris, EphemerisError};

/// Ephemeris backed by one in-memory coefficient blob.
///
/// Holds a one-instant query cache keyed on the last queried time: every body
/// already evaluated at that instant is memoized, so the integrator's repeat
/// lookups and an Earth-then-Moon pair at the same jd skip the polynomial
/// work. Querying a new time drops the whole cache. `RefCell` keeps queries
/// `&self`; the type is `!Sync` as a consequence.
pub struct ChebyshevEphemeris {
    blob: EphemerisBlob,
    cache: RefCell<InstantCache>,
}

struct InstantCache {
    jd: f64,
    states: [Option<StateVector>; body::BODY_COUNT],
}

impl InstantCache {
    fn empty() -> Self {
        // NaN compares unequal to every jd, so the first query misses.
        Self {
            jd: f64::NAN,
            states: [None; body::BODY_COUNT],
        }
    }
}

impl ChebyshevEphemeris {
    pub fn new(blob: EphemerisBlob) -> Self {
        Self {
            blob,
            cache: RefCell::new(InstantCache::empty()),
        }
    }

    /// Evaluate a stored series at `jd`, without the EMB/Moon corrections.
    fn eval_stored(&self, body: Body, jd: f64) -> StateVector {
        let (offset, layout) =
            body::series_offset(body).unwrap_or_else(|| panic!("{body:?} has no stored series"));

        let days_in = jd - self.blob.start_jd;
        let interval = ((days_in / INTERVAL_DAYS) as usize).min(self.blob.interval_count - 1);
        let record = self.blob.record(interval);

        let granule_days = INTERVAL_DAYS / layout.granule_count as f64;
        let days_in_interval = days_in - interval as f64 * INTERVAL_DAYS;
        let granule =
            ((days_in_interval / granule_days) as usize).min(layout.granule_count - 1);
        let days_in_granule = days_in_interval - granule as f64 * granule_days;

        // Normalized abscissa on [-1, 1] and the chain-rule velocity scale.
        let x = 2.0 * days_in_granule / granule_days - 1.0;
        let velocity_scale = 2.0 / (granule_days * SECONDS_PER_DAY);

        let granule_len = 3 * layout.coeff_count;
        let base = offset + granule * granule_len;

        let mut position_km = [0.0; 3];
        let mut velocity_km_s = [0.0; 3];
        for axis in 0..3 {
            let start = base + axis * layout.coeff_count;
            let coeffs = &record[start..start + layout.coeff_count];
            let (p, dp) = eval_polynomial(coeffs, x);
            position_km[axis] = p;
            velocity_km_s[axis] = dp * velocity_scale;
        }
        StateVector::new(position_km, velocity_km_s)
    }

    fn earth_from_emb(&self, jd: f64, moon_geocentric: &StateVector) -> StateVector {
        let emb = self.eval_stored(Body::EarthMoonBarycenter, jd);
        let factor = 1.0 / (1.0 + EARTH_MOON_MASS_RATIO);
        StateVector::new(
            vector::sub(
                &emb.position_km,
                &vector::scale(&moon_geocentric.position_km, factor),
            ),
            vector::sub(
                &emb.velocity_km_s,
                &vector::scale(&moon_geocentric.velocity_km_s, factor),
            ),
        )
    }
}

impl Ephemeris for ChebyshevEphemeris {
    fn bodies_supported(&self) -> u32 {
        body::full_support_mask()
    }

    fn start_jd(&self) -> f64 {
        self.blob.start_jd
    }

    fn end_jd(&self) -> f64 {
        self.blob.end_jd()
    }

    fn body_state_vector(&self, body: Body, jd: f64) -> Result<StateVector, EphemerisError> {
        if !self.supports(body) {
            return Err(EphemerisError::BodyNotSupported { body });
        }
        if jd < self.start_jd() || jd >= self.end_jd() {
            return Err(EphemerisError::TimeOutOfRange {
                jd,
                start_jd: self.start_jd(),
                end_jd: self.end_jd(),
            });
        }

        let mut cache = self.cache.borrow_mut();
        if cache.jd != jd {
            *cache = InstantCache::empty();
            cache.jd = jd;
        }
        if let Some(state) = cache.states[body.index()] {
            return Ok(state);
        }

        let state = match body {
            // The Moon series is geocentric; Earth and Moon barycentric
            // states share the EMB shift, so both cache slots fill together.
            Body::Earth | Body::Moon => {
                let geo = self.eval_stored(Body::Moon, jd);
                let earth = self.earth_from_emb(jd, &geo);
                let moon = StateVector::new(
                    vector::add(&earth.position_km, &geo.position_km),
                    vector::add(&earth.velocity_km_s, &geo.velocity_km_s),
                );
                cache.states[Body::Earth.index()] = Some(earth);
                cache.states[Body::Moon.index()] = Some(moon);
                if body == Body::Earth { earth } else { moon }
            }
            stored => {
                let state = self.eval_stored(stored, jd);
                cache.states[stored.index()] = Some(state);
                state
            }
        };
        Ok(state)
    }
}

/// Clenshaw-free Chebyshev evaluation: returns the polynomial value and its
/// derivative with respect to the normalized abscissa.
fn eval_polynomial(coeffs: &[f64], x: f64) -> (f64, f64) {
    let mut t_prev = 1.0;
    let mut t = x;
    let mut dt_prev = 0.0;
    let mut dt = 1.0;

    let mut value = coeffs[0];
    let mut derivative = 0.0;
    if coeffs.len() > 1 {
        value += coeffs[1] * t;
        derivative += coeffs[1] * dt;
    }
    for &c in &coeffs[2..] {
        let t_next = 2.0 * x * t - t_prev;
        let dt_next = 2.0 * t + 2.0 * x * dt - dt_prev;
        value += c * t_next;
        derivative += c * dt_next;
        t_prev = t;
        t = t_next;
        dt_prev = dt;
        dt = dt_next;
    }
    (value, derivative)
}
