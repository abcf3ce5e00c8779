//! Body indices and the fixed coefficient-series layout of ephemeris blobs.

/// Solar-system bodies addressable through the ephemeris.
///
/// Discriminants are the canonical body indices; they double as bit positions
/// in the support masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Body {
    Mercury = 0,
    Venus = 1,
    EarthMoonBarycenter = 2,
    Mars = 3,
    Jupiter = 4,
    Saturn = 5,
    Uranus = 6,
    Neptune = 7,
    Pluto = 8,
    /// Stored geocentric in the blobs; queries return barycentric.
    Moon = 9,
    Sun = 10,
    /// Derived from the EMB and geocentric Moon series.
    Earth = 11,
}

impl Body {
    /// Canonical index of the body.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Support-mask bit for this body.
    pub fn mask(self) -> u32 {
        1 << (self as u32)
    }
}

/// Number of addressable bodies (including the derived Earth).
pub const BODY_COUNT: usize = 12;

/// Coefficient-series allocation for one body within an interval record.
#[derive(Debug, Clone, Copy)]
pub struct SeriesLayout {
    pub body: Body,
    /// Chebyshev coefficients per axis per granule.
    pub coeff_count: usize,
    /// Granules (sub-intervals) per 32-day interval.
    pub granule_count: usize,
}

impl SeriesLayout {
    /// Doubles occupied by this body's series in one interval record.
    pub fn doubles(&self) -> usize {
        3 * self.coeff_count * self.granule_count
    }
}

/// Fixed per-body series allocation. The blob format is a bare list of
/// doubles; this table, not the file, defines where each series lives.
/// Fast movers get more granules, outer planets fewer coefficients.
pub const SERIES_LAYOUT: &[SeriesLayout] = &[
    SeriesLayout { body: Body::Mercury, coeff_count: 14, granule_count: 4 },
    SeriesLayout { body: Body::Venus, coeff_count: 10, granule_count: 2 },
    SeriesLayout { body: Body::EarthMoonBarycenter, coeff_count: 13, granule_count: 2 },
    SeriesLayout { body: Body::Mars, coeff_count: 11, granule_count: 1 },
    SeriesLayout { body: Body::Jupiter, coeff_count: 8, granule_count: 1 },
    SeriesLayout { body: Body::Saturn, coeff_count: 7, granule_count: 1 },
    SeriesLayout { body: Body::Uranus, coeff_count: 6, granule_count: 1 },
    SeriesLayout { body: Body::Neptune, coeff_count: 6, granule_count: 1 },
    SeriesLayout { body: Body::Pluto, coeff_count: 6, granule_count: 1 },
    SeriesLayout { body: Body::Moon, coeff_count: 13, granule_count: 8 },
    SeriesLayout { body: Body::Sun, coeff_count: 11, granule_count: 2 },
];

/// Days covered by one interval record.
pub const INTERVAL_DAYS: f64 = 32.0;

/// Doubles per interval record across all series.
pub fn record_doubles() -> usize {
    SERIES_LAYOUT.iter().map(SeriesLayout::doubles).sum()
}

/// Offset (in doubles) of a body's series within an interval record.
/// `None` for bodies without a stored series (the derived Earth).
pub fn series_offset(body: Body) -> Option<(usize, &'static SeriesLayout)> {
    let mut offset = 0;
    for layout in SERIES_LAYOUT {
        if layout.body == body {
            return Some((offset, layout));
        }
        offset += layout.doubles();
    }
    None
}

/// Support mask covering every stored series plus the derived Earth.
pub fn full_support_mask() -> u32 {
    SERIES_LAYOUT
        .iter()
        .fold(Body::Earth.mask(), |mask, layout| mask | layout.body.mask())
}
