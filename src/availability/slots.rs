//! Slot search.
//!
//! Decides whether a requested window can be booked and, when it cannot,
//! scans forward in fixed steps for free windows of the same length inside
//! office hours. The scan is bounded by a horizon, so the work per call is at
//! most `horizon / step` candidate evaluations. Output depends only on the
//! arguments: the same inputs always give the same suggestions.

use chrono::{Duration, Offset, TimeZone};
use chrono_tz::Tz;
use tracing::debug;

use super::conflict::{first_conflict, has_conflict};
use super::office_hours::{window_within_office_hours, WeeklyOfficeHours};
use crate::error::ConfigError;
use crate::types::{
    AvailabilityVerdict, BusyInterval, Confidence, Instant, SlotCandidate, TimeWindow,
    Unavailability,
};

/// Longest accepted horizon and lead time, in days.
pub const MAX_SEARCH_DAYS: i64 = 366;

const SECONDS_PER_DAY: i64 = 86_400;

/// Reason reported when the scan finds nothing.
pub const NO_SLOTS_REASON: &str = "no slots found in horizon";

/// Tunables for one search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// Minimum gap between "now" and a bookable start.
    pub min_lead: Duration,
    /// Distance between consecutive candidate starts.
    pub step: Duration,
    /// How far past the first candidate the scan may go.
    pub horizon: Duration,
    /// Maximum number of alternatives returned.
    pub max_suggestions: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            min_lead: Duration::minutes(15),
            step: Duration::minutes(15),
            horizon: Duration::days(7),
            max_suggestions: 3,
        }
    }
}

impl SearchParams {
    pub fn with_min_lead_minutes(mut self, minutes: u32) -> Self {
        self.min_lead = Duration::minutes(i64::from(minutes));
        self
    }

    pub fn with_max_suggestions(mut self, max_suggestions: usize) -> Self {
        self.max_suggestions = max_suggestions;
        self
    }

    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] for a step that is not a whole number of
    /// seconds dividing a day evenly, a horizon outside `1..=366` days, or a
    /// lead time that is negative or longer than 366 days.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, reason: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        let step_seconds = self.step.num_seconds();
        if step_seconds <= 0 || self.step != Duration::seconds(step_seconds) {
            return Err(invalid("search.step", "step must be a positive whole number of seconds"));
        }
        if SECONDS_PER_DAY % step_seconds != 0 {
            return Err(invalid("search.step", "step must divide a day evenly"));
        }
        let max = Duration::days(MAX_SEARCH_DAYS);
        if self.horizon <= Duration::zero() || self.horizon > max {
            return Err(invalid("search.horizon", "horizon must be between 1 and 366 days"));
        }
        if self.min_lead < Duration::zero() || self.min_lead > max {
            return Err(invalid("min_lead", "lead time must be between 0 and 366 days"));
        }
        Ok(())
    }
}

/// Resolve `requested` against office hours, busy intervals and the lead-time rule.
///
/// Unavailability is a normal outcome reported in the verdict.
///
/// # Errors
///
/// Only structural problems fail: an office-hours table with a missing weekday
/// or an enabled day whose start is not before its end, or invalid `params`.
pub fn find_slots(
    requested: &TimeWindow,
    hours: &WeeklyOfficeHours,
    tz: Tz,
    busy: &[BusyInterval],
    now: Instant,
    params: &SearchParams,
) -> Result<AvailabilityVerdict, ConfigError> {
    hours.validate()?;
    params.validate()?;

    let lead_limit = shift(now, params.min_lead, "min_lead")?;
    let earliest_allowed = lead_limit.max(requested.start());

    let rejection = if requested.start() < lead_limit {
        let shown = lead_limit.with_timezone(&tz).to_rfc3339();
        if requested.start() < now {
            Some((
                Unavailability::InThePast {
                    earliest_allowed: lead_limit,
                },
                format!("in the past; earliest allowed start is {}", shown),
            ))
        } else {
            Some((
                Unavailability::TooSoon {
                    earliest_allowed: lead_limit,
                },
                format!("too soon; earliest allowed start is {}", shown),
            ))
        }
    } else {
        let check = window_within_office_hours(requested, hours, tz);
        if !check.within {
            let reason = check.reason.unwrap_or_else(|| "outside office hours".to_string());
            Some((
                Unavailability::OutOfOfficeHours {
                    reason: reason.clone(),
                },
                reason,
            ))
        } else if let Some(clash) = first_conflict(requested, busy) {
            debug!(requested = %requested, busy = %clash.window, "Requested window conflicts");
            Some((
                Unavailability::Conflict,
                "conflicts with an existing booking".to_string(),
            ))
        } else {
            None
        }
    };

    let (unavailability, reason) = match rejection {
        None => {
            debug!(requested = %requested, "Requested window is available");
            return Ok(AvailabilityVerdict::available(earliest_allowed));
        }
        Some(rejection) => rejection,
    };

    let alternatives = scan_alternatives(requested, hours, tz, busy, earliest_allowed, params)?;
    let reason = if alternatives.is_empty() && params.max_suggestions > 0 {
        NO_SLOTS_REASON.to_string()
    } else {
        reason
    };

    debug!(
        requested = %requested,
        kind = unavailability.kind(),
        alternatives = alternatives.len(),
        "Requested window is unavailable"
    );

    Ok(AvailabilityVerdict::unavailable(
        unavailability,
        reason,
        earliest_allowed,
        alternatives,
    ))
}

/// Forward scan from `earliest_allowed`, aligned up to the step.
fn scan_alternatives(
    requested: &TimeWindow,
    hours: &WeeklyOfficeHours,
    tz: Tz,
    busy: &[BusyInterval],
    earliest_allowed: Instant,
    params: &SearchParams,
) -> Result<Vec<SlotCandidate>, ConfigError> {
    let mut alternatives = Vec::new();
    if params.max_suggestions == 0 {
        return Ok(alternatives);
    }

    let step_seconds = params.step.num_seconds();
    let length = requested.duration();
    let scan_start = align_up(earliest_allowed, step_seconds, tz)
        .ok_or_else(|| out_of_range("search.step", earliest_allowed))?;
    let horizon_end = shift(scan_start, params.horizon, "search.horizon")?;

    let mut cursor = scan_start;
    let mut evaluated = 0usize;
    while cursor < horizon_end && alternatives.len() < params.max_suggestions {
        evaluated += 1;
        if let Ok(candidate) = TimeWindow::starting_at(cursor, length) {
            if window_within_office_hours(&candidate, hours, tz).within
                && !has_conflict(&candidate, busy)
            {
                let steps = (cursor - requested.start()).num_seconds() / step_seconds;
                let steps = u32::try_from(steps.max(0)).unwrap_or(u32::MAX);
                alternatives.push(SlotCandidate {
                    window: candidate,
                    confidence: Confidence::from_distance(steps),
                });
            }
        }
        cursor = match cursor.checked_add_signed(params.step) {
            Some(next) => next,
            None => break,
        };
    }

    debug!(
        scan_start = %scan_start,
        evaluated,
        found = alternatives.len(),
        "Alternative scan finished"
    );
    Ok(alternatives)
}

/// Round `instant` up to the next local wall-clock multiple of `step_seconds`
/// in `tz`, using the offset in force at `instant`.
///
/// `step_seconds` divides a day, so candidates land on the same local
/// boundaries every day (:00/:20/:40 for a 20-minute step, even at +05:30).
fn align_up(instant: Instant, step_seconds: i64, tz: Tz) -> Option<Instant> {
    let offset = tz.offset_from_utc_datetime(&instant.naive_utc()).fix();
    let local_seconds = instant.timestamp() + i64::from(offset.local_minus_utc());
    let remainder = local_seconds.rem_euclid(step_seconds);
    let nanos = i64::from(instant.timestamp_subsec_nanos());
    if remainder == 0 && nanos == 0 {
        return Some(instant);
    }
    instant
        .checked_sub_signed(Duration::seconds(remainder) + Duration::nanoseconds(nanos))?
        .checked_add_signed(Duration::seconds(step_seconds))
}

fn shift(instant: Instant, by: Duration, key: &str) -> Result<Instant, ConfigError> {
    instant
        .checked_add_signed(by)
        .ok_or_else(|| out_of_range(key, instant))
}

fn out_of_range(key: &str, instant: Instant) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: format!("search from {} runs past the supported date range", instant),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::office_hours::DayHours;
    use chrono::{NaiveTime, TimeZone, Utc, Weekday};

    const MELBOURNE: Tz = chrono_tz::Australia::Melbourne;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    /// Melbourne wall clock, March 2026 (2026-03-16 is a Monday).
    fn local(day: u32, h: u32, m: u32) -> Instant {
        MELBOURNE
            .with_ymd_and_hms(2026, 3, day, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn window(start: Instant, end: Instant) -> TimeWindow {
        TimeWindow::new(start, end).unwrap()
    }

    fn office() -> WeeklyOfficeHours {
        WeeklyOfficeHours::weekdays(t(9, 0), t(17, 0))
    }

    fn assert_confidence_ordered(verdict: &AvailabilityVerdict) {
        for pair in verdict.alternatives.windows(2) {
            assert!(
                pair[0].confidence >= pair[1].confidence,
                "confidence increased: {} then {}",
                pair[0].confidence,
                pair[1].confidence
            );
        }
    }

    #[test]
    fn test_free_weekday_slot() {
        let requested = window(local(17, 10, 0), local(17, 11, 0));
        let verdict = find_slots(
            &requested,
            &office(),
            MELBOURNE,
            &[],
            local(16, 9, 0),
            &SearchParams::default(),
        )
        .unwrap();

        assert!(verdict.is_available);
        assert!(verdict.alternatives.is_empty());
        assert!(verdict.reason.is_none());
    }

    #[test]
    fn test_saturday_suggests_monday() {
        let requested = window(local(21, 10, 0), local(21, 11, 0));
        let verdict = find_slots(
            &requested,
            &office(),
            MELBOURNE,
            &[],
            local(16, 9, 0),
            &SearchParams::default(),
        )
        .unwrap();

        assert!(!verdict.is_available);
        let reason = verdict.reason.as_deref().unwrap();
        assert!(reason.contains("closed") && reason.contains("Saturday"), "{}", reason);
        assert!(matches!(
            verdict.unavailability,
            Some(Unavailability::OutOfOfficeHours { .. })
        ));

        assert_eq!(verdict.alternatives.len(), 3);
        assert_eq!(verdict.alternatives[0].window, window(local(23, 9, 0), local(23, 10, 0)));
        for alternative in &verdict.alternatives {
            assert!(alternative.window.start() >= local(23, 9, 0));
            assert_eq!(alternative.window.duration(), Duration::hours(1));
        }
        assert_confidence_ordered(&verdict);
    }

    #[test]
    fn test_touching_boundary_is_first_alternative() {
        let hours = WeeklyOfficeHours::on_days(&[Weekday::Mon], t(9, 0), t(17, 0));
        let busy = vec![BusyInterval::new(window(local(16, 10, 0), local(16, 10, 30)))];
        let requested = window(local(16, 10, 0), local(16, 10, 30));

        let verdict = find_slots(
            &requested,
            &hours,
            MELBOURNE,
            &busy,
            local(16, 8, 0),
            &SearchParams::default(),
        )
        .unwrap();

        assert!(!verdict.is_available);
        assert_eq!(verdict.unavailability, Some(Unavailability::Conflict));
        let first = &verdict.alternatives[0];
        assert_eq!(first.window, window(local(16, 10, 30), local(16, 11, 0)));
        // Two 15-minute steps after the requested start.
        assert_eq!(first.confidence, Confidence::from_distance(2));
    }

    #[test]
    fn test_too_soon_is_not_shifted() {
        let requested = window(local(16, 10, 0), local(16, 10, 30));
        let verdict = find_slots(
            &requested,
            &office(),
            MELBOURNE,
            &[],
            local(16, 9, 50),
            &SearchParams::default().with_min_lead_minutes(15),
        )
        .unwrap();

        assert!(!verdict.is_available);
        assert_eq!(
            verdict.unavailability,
            Some(Unavailability::TooSoon {
                earliest_allowed: local(16, 10, 5)
            })
        );
        assert_eq!(verdict.earliest_allowed, local(16, 10, 5));
        assert!(verdict.reason.as_deref().unwrap().starts_with("too soon"));
        // Suggestions begin at the next quarter hour after 10:05.
        assert_eq!(verdict.alternatives[0].window.start(), local(16, 10, 15));
        assert!(verdict
            .alternatives
            .iter()
            .all(|slot| slot.window != requested));
    }

    #[test]
    fn test_in_the_past() {
        let requested = window(local(16, 10, 0), local(16, 10, 30));
        let verdict = find_slots(
            &requested,
            &office(),
            MELBOURNE,
            &[],
            local(16, 12, 0),
            &SearchParams::default(),
        )
        .unwrap();

        assert_eq!(
            verdict.unavailability,
            Some(Unavailability::InThePast {
                earliest_allowed: local(16, 12, 15)
            })
        );
        assert!(verdict.reason.as_deref().unwrap().starts_with("in the past"));
        assert_eq!(verdict.alternatives[0].window.start(), local(16, 12, 15));
    }

    #[test]
    fn test_fully_booked_horizon() {
        let mut busy = Vec::new();
        for day in 16..=31 {
            busy.push(BusyInterval::new(window(local(day, 9, 0), local(day, 17, 0))));
        }
        let requested = window(local(16, 10, 0), local(16, 11, 0));

        let verdict = find_slots(
            &requested,
            &office(),
            MELBOURNE,
            &busy,
            local(16, 8, 0),
            &SearchParams::default(),
        )
        .unwrap();

        assert!(!verdict.is_available);
        assert!(verdict.alternatives.is_empty());
        assert_eq!(verdict.reason.as_deref(), Some(NO_SLOTS_REASON));
        assert_eq!(verdict.unavailability, Some(Unavailability::Conflict));
    }

    #[test]
    fn test_request_running_past_closing() {
        let requested = window(local(16, 16, 30), local(16, 17, 30));
        let verdict = find_slots(
            &requested,
            &office(),
            MELBOURNE,
            &[],
            local(16, 8, 0),
            &SearchParams::default(),
        )
        .unwrap();

        assert!(!verdict.is_available);
        assert!(verdict.reason.as_deref().unwrap().starts_with("outside hours"));
        // 16:00-17:00 is before the request, so the next fit is Tuesday morning.
        assert_eq!(verdict.alternatives[0].window.start(), local(17, 9, 0));
    }

    #[test]
    fn test_lead_time_monotonicity() {
        let now = local(16, 9, 0);
        let params = SearchParams::default();
        let hours = office();
        let accepts = |start: Instant| {
            let requested = TimeWindow::starting_at(start, Duration::minutes(30)).unwrap();
            find_slots(&requested, &hours, MELBOURNE, &[], now, &params)
                .unwrap()
                .is_available
        };

        for minute in 0..60 {
            let start = now + Duration::minutes(minute);
            if accepts(start) {
                assert!(accepts(start + Duration::seconds(1)), "lost acceptance after {}", start);
            }
        }
        assert!(!accepts(now + Duration::minutes(14)));
        assert!(accepts(now + Duration::minutes(15)));
    }

    #[test]
    fn test_alternatives_skip_busy_and_stay_ordered() {
        let busy = vec![
            BusyInterval::new(window(local(16, 11, 0), local(16, 12, 0))),
            BusyInterval::new(window(local(16, 10, 0), local(16, 10, 45))),
        ];
        let requested = window(local(16, 10, 0), local(16, 10, 30));
        let params = SearchParams::default().with_max_suggestions(5);

        let verdict =
            find_slots(&requested, &office(), MELBOURNE, &busy, local(16, 8, 0), &params).unwrap();

        let starts: Vec<_> = verdict.alternatives.iter().map(|s| s.window.start()).collect();
        assert_eq!(
            starts,
            vec![
                local(16, 12, 0),
                local(16, 12, 15),
                local(16, 12, 30),
                local(16, 12, 45),
                local(16, 13, 0),
            ]
        );
        assert_confidence_ordered(&verdict);
    }

    #[test]
    fn test_same_inputs_same_suggestions() {
        let busy = vec![BusyInterval::new(window(local(17, 9, 0), local(17, 13, 0)))];
        let requested = window(local(17, 9, 0), local(17, 10, 0));
        let run = || {
            find_slots(
                &requested,
                &office(),
                MELBOURNE,
                &busy,
                local(16, 9, 0),
                &SearchParams::default(),
            )
            .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_horizon_bounds_search() {
        // Only Sunday is open; a one-day horizon from Monday finds nothing.
        let hours = WeeklyOfficeHours::on_days(&[Weekday::Sun], t(9, 0), t(17, 0));
        let requested = window(local(16, 10, 0), local(16, 11, 0));
        let params = SearchParams {
            horizon: Duration::days(1),
            ..SearchParams::default()
        };
        let verdict =
            find_slots(&requested, &hours, MELBOURNE, &[], local(16, 8, 0), &params).unwrap();
        assert!(verdict.alternatives.is_empty());
        assert_eq!(verdict.reason.as_deref(), Some(NO_SLOTS_REASON));

        let wide = SearchParams::default();
        let verdict =
            find_slots(&requested, &hours, MELBOURNE, &[], local(16, 8, 0), &wide).unwrap();
        assert_eq!(verdict.alternatives[0].window.start(), local(22, 9, 0));
    }

    #[test]
    fn test_invalid_configuration_is_an_error() {
        let requested = window(local(16, 10, 0), local(16, 11, 0));
        let overnight = office().with_day(Weekday::Mon, DayHours::open(t(22, 0), t(6, 0)));
        let result = find_slots(
            &requested,
            &overnight,
            MELBOURNE,
            &[],
            local(16, 8, 0),
            &SearchParams::default(),
        );
        assert!(matches!(result, Err(ConfigError::InvalidOfficeHours { .. })));

        let incomplete = WeeklyOfficeHours::new();
        let result = find_slots(
            &requested,
            &incomplete,
            MELBOURNE,
            &[],
            local(16, 8, 0),
            &SearchParams::default(),
        );
        assert!(matches!(result, Err(ConfigError::MissingWeekday(_))));
    }

    #[test]
    fn test_align_up() {
        let exact = Utc.with_ymd_and_hms(2026, 3, 16, 10, 15, 0).unwrap();
        assert_eq!(align_up(exact, 900, Tz::UTC), Some(exact));

        let off = Utc.with_ymd_and_hms(2026, 3, 16, 10, 5, 30).unwrap();
        assert_eq!(align_up(off, 900, Tz::UTC), Some(exact));

        let nanos = exact + Duration::nanoseconds(1);
        assert_eq!(align_up(nanos, 900, Tz::UTC), Some(exact + Duration::minutes(15)));
    }

    #[test]
    fn test_align_up_uses_local_boundaries() {
        const KOLKATA: Tz = chrono_tz::Asia::Kolkata;
        // 04:35 UTC is 10:05 in Kolkata (+05:30); a 20-minute step lands on 10:20 local.
        let instant = Utc.with_ymd_and_hms(2026, 3, 16, 4, 35, 0).unwrap();
        let aligned = align_up(instant, 1200, KOLKATA).unwrap();
        assert_eq!(
            aligned,
            KOLKATA.with_ymd_and_hms(2026, 3, 16, 10, 20, 0).unwrap().with_timezone(&Utc)
        );
    }

    #[test]
    fn test_twenty_minute_step_suggests_local_boundaries() {
        const KOLKATA: Tz = chrono_tz::Asia::Kolkata;
        let at = |day: u32, h: u32, m: u32| {
            KOLKATA
                .with_ymd_and_hms(2026, 3, day, h, m, 0)
                .unwrap()
                .with_timezone(&Utc)
        };
        let params = SearchParams {
            step: Duration::minutes(20),
            ..SearchParams::default()
        };
        // Saturday request; scan from the request start finds Monday's opening.
        let requested = window(at(21, 10, 5), at(21, 10, 25));
        let verdict =
            find_slots(&requested, &office(), KOLKATA, &[], at(16, 8, 0), &params).unwrap();
        let starts: Vec<_> = verdict.alternatives.iter().map(|a| a.window.start()).collect();
        assert_eq!(starts, vec![at(23, 9, 0), at(23, 9, 20), at(23, 9, 40)]);
    }

    #[test]
    fn test_search_bounds_are_validated() {
        let huge_horizon = SearchParams {
            horizon: Duration::days(1_000_000_000),
            ..SearchParams::default()
        };
        assert!(matches!(
            huge_horizon.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let uneven_step = SearchParams {
            step: Duration::minutes(7),
            ..SearchParams::default()
        };
        assert!(uneven_step.validate().is_err());

        let huge_step = SearchParams {
            step: Duration::days(2),
            ..SearchParams::default()
        };
        assert!(huge_step.validate().is_err());

        let long_lead = SearchParams::default().with_min_lead_minutes(u32::MAX);
        assert!(long_lead.validate().is_err());
    }

    #[test]
    fn test_huge_horizon_is_a_config_error_not_a_panic() {
        let requested = window(local(21, 10, 0), local(21, 11, 0));
        let params = SearchParams {
            horizon: Duration::days(1_000_000_000),
            ..SearchParams::default()
        };
        let result = find_slots(&requested, &office(), MELBOURNE, &[], local(16, 8, 0), &params);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_scan_near_the_end_of_time_is_a_config_error() {
        let end_of_time = Instant::MAX_UTC - Duration::days(3);
        let requested = TimeWindow::starting_at(end_of_time, Duration::hours(1)).unwrap();
        let result = find_slots(
            &requested,
            &office(),
            Tz::UTC,
            &[],
            end_of_time - Duration::days(1),
            &SearchParams::default(),
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
