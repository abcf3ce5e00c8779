//! Simulation time base.
//!
//! The canonical clock is an integer tick counter at a fixed rate. Julian
//! dates and calendar dates are derived through fixed affine conversions at
//! the boundary; nothing inside the engine keeps wall-clock time.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::constants::{J2000_JD, SECONDS_PER_DAY};

/// Simulation ticks per simulated second.
pub const TICKS_PER_SECOND: u64 = 20;

/// Monotonic simulation tick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(pub u64);

impl Tick {
    /// Tick corresponding to `seconds` of simulated time, rounded down.
    pub fn from_seconds(seconds: f64) -> Self {
        Tick((seconds.max(0.0) * TICKS_PER_SECOND as f64) as u64)
    }

    /// Simulated seconds represented by this tick.
    pub fn as_seconds(self) -> f64 {
        self.0 as f64 / TICKS_PER_SECOND as f64
    }

    /// Tick advanced by a whole number of ticks.
    pub fn plus(self, ticks: u64) -> Self {
        Tick(self.0 + ticks)
    }

    /// Tick advanced by simulated seconds, rounded to the nearest tick.
    pub fn plus_seconds(self, seconds: f64) -> Self {
        Tick(self.0 + (seconds * TICKS_PER_SECOND as f64).round().max(0.0) as u64)
    }
}

/// Convert days to seconds.
#[inline]
pub fn days_to_seconds(days: f64) -> f64 {
    days * SECONDS_PER_DAY
}

/// Convert seconds to days.
#[inline]
pub fn seconds_to_days(seconds: f64) -> f64 {
    seconds / SECONDS_PER_DAY
}

/// Julian date reached `seconds` after the epoch `epoch_jd`.
#[inline]
pub fn julian_date(epoch_jd: f64, seconds: f64) -> f64 {
    epoch_jd + seconds / SECONDS_PER_DAY
}

/// Seconds elapsed between `epoch_jd` and the Julian date `jd`.
#[inline]
pub fn seconds_since(epoch_jd: f64, jd: f64) -> f64 {
    (jd - epoch_jd) * SECONDS_PER_DAY
}

/// Julian date of a calendar date/time (proleptic Gregorian, no leap seconds).
pub fn calendar_to_julian(datetime: NaiveDateTime) -> f64 {
    let j2000 = NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap_or_default();
    let delta = datetime.signed_duration_since(j2000);
    J2000_JD + delta.num_milliseconds() as f64 / 1_000.0 / SECONDS_PER_DAY
}

/// Calendar date/time of a Julian date. Returns `None` outside chrono's range.
pub fn julian_to_calendar(jd: f64) -> Option<NaiveDateTime> {
    let j2000 = NaiveDate::from_ymd_opt(2000, 1, 1)?.and_hms_opt(12, 0, 0)?;
    let millis = ((jd - J2000_JD) * SECONDS_PER_DAY * 1_000.0).round() as i64;
    j2000.checked_add_signed(chrono::Duration::milliseconds(millis))
}

/// Format a Julian date as a UTC-style calendar string for reports.
pub fn format_julian(jd: f64) -> String {
    match julian_to_calendar(jd) {
        Some(dt) => format!(
            "{} {:02}:{:02}:{:02}",
            dt.date(),
            dt.hour(),
            dt.minute(),
            dt.second()
        ),
        None => format!("JD {jd:.6}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_second_round_trip() {
        let t = Tick::from_seconds(12.5);
        assert_eq!(t.0, 12 * TICKS_PER_SECOND + TICKS_PER_SECOND / 2);
        assert!((t.as_seconds() - 12.5).abs() < 1e-12);
    }

    #[test]
    fn julian_affine_conversions() {
        let epoch = J2000_JD;
        let jd = julian_date(epoch, SECONDS_PER_DAY * 3.25);
        assert!((jd - (epoch + 3.25)).abs() < 1e-12);
        assert!((seconds_since(epoch, jd) - SECONDS_PER_DAY * 3.25).abs() < 1e-6);
    }

    #[test]
    fn calendar_round_trip_at_j2000() {
        let dt = julian_to_calendar(J2000_JD).unwrap();
        assert_eq!(dt.date().to_string(), "2000-01-01");
        assert!((calendar_to_julian(dt) - J2000_JD).abs() < 1e-9);
    }
}
