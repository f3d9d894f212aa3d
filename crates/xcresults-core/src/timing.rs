//! Timestamp parsing and duration arithmetic.

use chrono::DateTime;

/// Format of `xcresulttool` timestamps: `2023-02-27T10:15:30.123+0300`.
const SOURCE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Milliseconds since the Unix epoch, or `None` when `raw` does not parse.
///
/// RFC 3339 (`Z` or `+03:00` offsets) is accepted as well.
#[must_use]
pub fn parse_date(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    DateTime::parse_from_str(raw, SOURCE_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|instant| instant.timestamp_millis())
}

/// Seconds → whole milliseconds, rounded to nearest.
///
/// Negative and non-finite durations have no meaningful interval and yield
/// `None`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn duration_to_ms(seconds: f64) -> Option<i64> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let millis = (seconds * 1000.0).round();
    if millis > i64::MAX as f64 {
        return None;
    }
    Some(millis as i64)
}

/// `(start, start + duration)` when both parts are known.
#[must_use]
pub fn interval(start: Option<i64>, duration_seconds: Option<f64>) -> Option<(i64, i64)> {
    let start = start?;
    let stop = start.checked_add(duration_to_ms(duration_seconds?)?)?;
    Some((start, stop))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parses_source_format_with_offset() {
        assert_eq!(parse_date("1970-01-01T00:00:01.500+0000"), Some(1500));
        assert_eq!(parse_date("1970-01-01T03:00:00.000+0300"), Some(0));
    }

    #[test]
    fn parses_rfc3339_fallback() {
        assert_eq!(parse_date("1970-01-01T00:00:02Z"), Some(2000));
        assert_eq!(parse_date("1970-01-01T01:00:00.250+01:00"), Some(250));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2023-13-45T99:00:00.000+0000"), None);
    }

    #[test]
    fn durations_round_to_millis() {
        assert_eq!(duration_to_ms(1.2), Some(1200));
        assert_eq!(duration_to_ms(0.4), Some(400));
        assert_eq!(duration_to_ms(0.0004), Some(0));
        assert_eq!(duration_to_ms(0.0005), Some(1));
        assert_eq!(duration_to_ms(-1.0), None);
        assert_eq!(duration_to_ms(f64::NAN), None);
    }

    #[test]
    fn interval_needs_both_parts() {
        assert_eq!(interval(Some(10), Some(1.0)), Some((10, 1010)));
        assert_eq!(interval(None, Some(1.0)), None);
        assert_eq!(interval(Some(10), None), None);
    }

    proptest! {
        #[test]
        fn interval_stop_never_precedes_start(
            start in 0_i64..4_000_000_000_000,
            seconds in 0.0_f64..100_000.0,
        ) {
            let (from, to) = interval(Some(start), Some(seconds)).unwrap();
            prop_assert_eq!(from, start);
            prop_assert!(to >= from);
        }
    }
}
