//! Overlap checks between a candidate window and busy intervals.

use crate::types::{BusyInterval, TimeWindow};

/// Whether `candidate` overlaps any busy interval.
///
/// Intervals are half-open, so a booking that starts exactly when another
/// ends is free. `busy` may be in any order.
pub fn has_conflict(candidate: &TimeWindow, busy: &[BusyInterval]) -> bool {
    first_conflict(candidate, busy).is_some()
}

/// The first busy interval (in slice order) that overlaps `candidate`.
pub fn first_conflict<'a>(
    candidate: &TimeWindow,
    busy: &'a [BusyInterval],
) -> Option<&'a BusyInterval> {
    busy.iter().find(|interval| candidate.overlaps(&interval.window))
}

/// Busy intervals minus the one belonging to `event_id`.
///
/// Used when moving an existing event so it does not conflict with itself.
pub fn excluding_event(busy: Vec<BusyInterval>, event_id: &str) -> Vec<BusyInterval> {
    busy.into_iter()
        .filter(|interval| interval.event_id.as_deref() != Some(event_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn window(start_min: i64, end_min: i64) -> TimeWindow {
        let base = Utc.with_ymd_and_hms(2026, 3, 16, 9, 0, 0).unwrap();
        TimeWindow::new(
            base + Duration::minutes(start_min),
            base + Duration::minutes(end_min),
        )
        .unwrap()
    }

    fn busy(start_min: i64, end_min: i64) -> BusyInterval {
        BusyInterval::new(window(start_min, end_min))
    }

    #[test]
    fn test_touching_boundaries_are_free() {
        for (a, b) in [((0, 30), (30, 60)), ((30, 60), (0, 30)), ((15, 45), (45, 120))] {
            assert!(
                !has_conflict(&window(a.0, a.1), &[busy(b.0, b.1)]),
                "{:?} touching {:?} should not conflict",
                a,
                b
            );
        }
    }

    #[test]
    fn test_overlaps_conflict() {
        let cases = [
            ((0, 30), (15, 45)),  // partial
            ((0, 60), (15, 30)),  // contains
            ((15, 30), (0, 60)),  // contained
            ((0, 30), (0, 30)),   // identical
            ((29, 31), (30, 90)), // one minute
        ];
        for (a, b) in cases {
            assert!(
                has_conflict(&window(a.0, a.1), &[busy(b.0, b.1)]),
                "{:?} and {:?} should conflict",
                a,
                b
            );
        }
    }

    #[test]
    fn test_unordered_busy_list() {
        let intervals = vec![busy(300, 330), busy(0, 30), busy(120, 180)];
        assert!(has_conflict(&window(150, 160), &intervals));
        assert!(!has_conflict(&window(30, 120), &intervals));
        assert_eq!(
            first_conflict(&window(100, 310), &intervals).map(|b| b.window),
            Some(window(300, 330))
        );
    }

    #[test]
    fn test_empty_busy_list() {
        assert!(!has_conflict(&window(0, 30), &[]));
    }

    #[test]
    fn test_excluding_event() {
        let intervals = vec![busy(0, 30).with_event_id("evt-1"), busy(60, 90)];
        let remaining = excluding_event(intervals, "evt-1");
        assert_eq!(remaining.len(), 1);
        assert!(!has_conflict(&window(0, 30), &remaining));
    }
}
