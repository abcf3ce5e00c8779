//! Core units, constants, time base, and shared primitives for the orbital
//! mission engine workspace.

pub mod time;

/// Physical constants expressed in SI-derived km/s units (unless stated otherwise).
pub mod constants {
    /// Standard gravity at Earth's surface (m/s²).
    pub const G0: f64 = 9.80665;
    /// Kilometres per astronomical unit.
    pub const AU_KM: f64 = 149_597_870.7;
    /// Seconds per Julian day.
    pub const SECONDS_PER_DAY: f64 = 86_400.0;
    /// Julian date of the J2000.0 epoch (2000 Jan 1, 12:00 TDB).
    pub const J2000_JD: f64 = 2_451_545.0;
    /// Heliocentric gravitational parameter (km³/s²).
    pub const MU_SUN: f64 = 1.327_124_400_18e11;
    /// Geocentric gravitational parameter (km³/s²).
    pub const MU_EARTH: f64 = 3.986_004_418e5;
    /// Earth/Moon mass ratio used by the barycentric correction.
    pub const EARTH_MOON_MASS_RATIO: f64 = 81.300_56;
}

/// Basic unit conversion helpers.
pub mod units {
    /// Convert kilometres to metres.
    #[inline]
    pub fn km_to_m(v: f64) -> f64 {
        v * 1_000.0
    }

    /// Convert metres to kilometres.
    #[inline]
    pub fn m_to_km(v: f64) -> f64 {
        v / 1_000.0
    }

    /// Convert kilometres per second to metres per second.
    #[inline]
    pub fn kms_to_ms(v: f64) -> f64 {
        v * 1_000.0
    }

    /// Convert metres per second to kilometres per second.
    #[inline]
    pub fn ms_to_kms(v: f64) -> f64 {
        v / 1_000.0
    }

    /// Convert degrees to radians.
    #[inline]
    pub fn deg_to_rad(v: f64) -> f64 {
        v.to_radians()
    }
}

/// Minimal vector helpers to avoid ad-hoc `[f64; 3]` math everywhere.
pub mod vector {
    /// Alias for a 3D vector in kilometres or km/s depending on context.
    pub type Vector3 = [f64; 3];

    /// Euclidean norm of a vector.
    #[inline]
    pub fn norm(v: &Vector3) -> f64 {
        dot(v, v).sqrt()
    }

    /// Dot product of two vectors.
    #[inline]
    pub fn dot(a: &Vector3, b: &Vector3) -> f64 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    /// Vector addition.
    #[inline]
    pub fn add(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
    }

    /// Vector subtraction.
    #[inline]
    pub fn sub(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    /// Scale a vector by a scalar.
    #[inline]
    pub fn scale(v: &Vector3, s: f64) -> Vector3 {
        [v[0] * s, v[1] * s, v[2] * s]
    }

    /// Cross product a × b.
    #[inline]
    pub fn cross(a: &Vector3, b: &Vector3) -> Vector3 {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    /// Unit vector in the direction of `v`. Returns `None` for a zero vector.
    #[inline]
    pub fn unit(v: &Vector3) -> Option<Vector3> {
        let n = norm(v);
        if n > 0.0 { Some(scale(v, 1.0 / n)) } else { None }
    }
}

/// Position and velocity at an instant. The reference frame and the epoch the
/// vectors are valid at are caller contracts, not tracked by the type.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateVector {
    pub position_km: vector::Vector3,
    pub velocity_km_s: vector::Vector3,
}

impl StateVector {
    /// Construct from raw position/velocity components.
    pub fn new(position_km: vector::Vector3, velocity_km_s: vector::Vector3) -> Self {
        Self {
            position_km,
            velocity_km_s,
        }
    }

    /// Distance from the frame origin (km).
    pub fn radius_km(&self) -> f64 {
        vector::norm(&self.position_km)
    }

    /// Speed relative to the frame (km/s).
    pub fn speed_km_s(&self) -> f64 {
        vector::norm(&self.velocity_km_s)
    }
}
