//! General time utility functions

use chrono;
use std::time::Duration;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Get the period of a cycle running at the given frequency.
///
/// Returns `None` if the frequency does not give a representable period (for
/// example zero, negative, or NaN frequencies).
pub fn period_from_hz(frequency_hz: f64) -> Option<Duration> {
    if !(frequency_hz > 0.0) {
        return None;
    }

    Duration::try_from_secs_f64(1.0 / frequency_hz).ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_period_from_hz() {
        assert_eq!(period_from_hz(2.0), Some(Duration::from_millis(500)));
        assert_eq!(period_from_hz(0.0), None);
        assert_eq!(period_from_hz(-1.0), None);
        assert_eq!(period_from_hz(std::f64::NAN), None);
    }

    #[test]
    fn test_duration_to_seconds() {
        let d = chrono::Duration::milliseconds(1500);
        assert_eq!(duration_to_seconds(d), Some(1.5));
    }
}
