//! Date-time normalization.
//!
//! Turns caller-supplied ISO 8601 strings into UTC instants. Strings with an
//! explicit offset (or `Z`) are taken at face value; offset-less strings are
//! read as wall-clock time in the timezone the caller passes in.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::NormalizeError;
use crate::types::{Instant, TimeWindow};

/// Offset-carrying formats tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
];

/// UTC designator forms RFC 3339 does not cover (it requires seconds).
const ZULU_FORMATS: &[&str] = &["%Y-%m-%dT%H:%MZ", "%Y-%m-%d %H:%MZ", "%Y-%m-%d %H:%M:%S%.fZ"];

/// Formats without an offset, interpreted in the supplied timezone.
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse `input` into an instant.
///
/// DST-ambiguous local times resolve to the earlier of the two instants;
/// local times skipped by a DST jump are rejected.
///
/// # Errors
///
/// Returns [`NormalizeError::InvalidDateTime`] when the string is not a
/// recognizable date-time, has out-of-range fields, or names a local time
/// that does not exist in `tz`.
pub fn normalize(input: &str, tz: Tz) -> Result<Instant, NormalizeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid(input, "empty value"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    if let Some(naive) = ZULU_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
    {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    let naive = LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| invalid(input, "not an ISO 8601 date-time"))?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(invalid(
            input,
            &format!("local time does not exist in {}", tz.name()),
        )),
    }
}

/// Normalize both ends of a requested window.
///
/// # Errors
///
/// Fails if either end is invalid or if `end <= start`.
pub fn normalize_window(start: &str, end: &str, tz: Tz) -> Result<TimeWindow, NormalizeError> {
    let start = normalize(start, tz)?;
    let end = normalize(end, tz)?;
    TimeWindow::new(start, end)
}

fn invalid(input: &str, reason: &str) -> NormalizeError {
    NormalizeError::InvalidDateTime {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const MELBOURNE: Tz = chrono_tz::Australia::Melbourne;

    #[test]
    fn test_explicit_offset() {
        let instant = normalize("2026-03-17T10:00:00+11:00", MELBOURNE).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2026, 3, 16, 23, 0, 0).unwrap());

        let zulu = normalize("2026-03-16T23:00:00Z", Tz::UTC).unwrap();
        assert_eq!(instant, zulu);

        // Minute precision with the UTC designator ignores the supplied zone.
        let minutes_zulu = normalize("2026-03-16T23:00Z", MELBOURNE).unwrap();
        assert_eq!(instant, minutes_zulu);
        let spaced = normalize("2026-03-16 23:00Z", MELBOURNE).unwrap();
        assert_eq!(instant, spaced);
    }

    #[test]
    fn test_offset_less_uses_supplied_timezone() {
        // Melbourne is on AEDT (+11:00) in March.
        let instant = normalize("2026-03-17T10:00:00", MELBOURNE).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2026, 3, 16, 23, 0, 0).unwrap());

        let minutes_only = normalize("2026-03-17T10:00", MELBOURNE).unwrap();
        assert_eq!(instant, minutes_only);
    }

    #[test]
    fn test_compact_offset() {
        let instant = normalize("2026-03-17T10:00:00+0530", MELBOURNE).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2026, 3, 17, 4, 30, 0).unwrap());
    }

    #[test]
    fn test_rejects_malformed() {
        for input in [
            "",
            "tomorrow at 3",
            "2026-13-01T10:00:00Z",
            "2026-03-17T25:00:00",
            "2026-02-30T10:00:00",
            "2026-03-17",
        ] {
            let result = normalize(input, MELBOURNE);
            assert!(
                matches!(result, Err(NormalizeError::InvalidDateTime { .. })),
                "expected '{}' to be rejected, got {:?}",
                input,
                result
            );
        }
    }

    #[test]
    fn test_dst_gap_is_rejected() {
        // Clocks jump 02:00 -> 03:00 in Melbourne on 2026-10-04.
        let result = normalize("2026-10-04T02:30:00", MELBOURNE);
        assert!(matches!(result, Err(NormalizeError::InvalidDateTime { .. })));
    }

    #[test]
    fn test_dst_overlap_takes_earliest() {
        // Clocks fall back 03:00 -> 02:00 in Melbourne on 2026-04-05.
        let instant = normalize("2026-04-05T02:30:00", MELBOURNE).unwrap();
        // The first 02:30 is still on AEDT (+11:00).
        assert_eq!(instant, Utc.with_ymd_and_hms(2026, 4, 4, 15, 30, 0).unwrap());
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for input in [
            "2026-03-17T10:00:00",
            "2026-03-17T10:00:00.250+11:00",
            "2026-06-01 08:15",
            "2026-03-16T23:00:00Z",
        ] {
            let first = normalize(input, MELBOURNE).unwrap();
            let second = normalize(&first.to_rfc3339(), MELBOURNE).unwrap();
            assert_eq!(first, second, "normalization drifted for '{}'", input);
        }
    }

    #[test]
    fn test_normalize_window() {
        let window =
            normalize_window("2026-03-17T10:00:00", "2026-03-17T11:00:00", MELBOURNE).unwrap();
        assert_eq!(window.duration(), chrono::Duration::hours(1));

        let inverted = normalize_window("2026-03-17T11:00:00", "2026-03-17T10:00:00", MELBOURNE);
        assert!(matches!(inverted, Err(NormalizeError::EmptyWindow { .. })));
    }
}
