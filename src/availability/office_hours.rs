//! Weekly office hours and the evaluator that checks instants against them.
//!
//! Hours are wall-clock times in the agent's IANA timezone. Every check
//! converts the UTC instant into that zone first; the server's local zone is
//! never consulted.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::ConfigError;
use crate::types::{Instant, TimeWindow};

const INVALID_CONFIGURATION: &str = "invalid office-hours configuration";

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Working window for one weekday. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub enabled: bool,
}

impl DayHours {
    pub fn open(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start,
            end,
            enabled: true,
        }
    }

    pub fn closed() -> Self {
        Self {
            start: NaiveTime::MIN,
            end: NaiveTime::MIN,
            enabled: false,
        }
    }

    /// Enabled days need `start < end`; windows crossing midnight are not supported.
    fn is_well_formed(&self) -> bool {
        !self.enabled || self.start < self.end
    }
}

impl fmt::Display for DayHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.enabled {
            write!(f, "{}–{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
        } else {
            write!(f, "closed")
        }
    }
}

/// Office hours for each day of the week.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeeklyOfficeHours {
    days: [Option<DayHours>; 7],
}

impl WeeklyOfficeHours {
    /// A table with no entries. Every weekday must be set before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `start..end` on the given days and closed on the rest.
    pub fn on_days(days: &[Weekday], start: NaiveTime, end: NaiveTime) -> Self {
        let mut hours = Self::new();
        for weekday in WEEK {
            let entry = if days.contains(&weekday) {
                DayHours::open(start, end)
            } else {
                DayHours::closed()
            };
            hours.set(weekday, entry);
        }
        hours
    }

    /// Monday to Friday, `start..end`.
    pub fn weekdays(start: NaiveTime, end: NaiveTime) -> Self {
        Self::on_days(&WEEK[..5], start, end)
    }

    pub fn set(&mut self, weekday: Weekday, hours: DayHours) {
        self.days[weekday.num_days_from_monday() as usize] = Some(hours);
    }

    pub fn with_day(mut self, weekday: Weekday, hours: DayHours) -> Self {
        self.set(weekday, hours);
        self
    }

    pub fn get(&self, weekday: Weekday) -> Option<&DayHours> {
        self.days[weekday.num_days_from_monday() as usize].as_ref()
    }

    /// Check that every weekday has an entry and every enabled day has `start < end`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingWeekday`] or [`ConfigError::InvalidOfficeHours`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        for weekday in WEEK {
            let day = self
                .get(weekday)
                .ok_or_else(|| ConfigError::MissingWeekday(weekday_name(weekday).to_string()))?;
            if !day.is_well_formed() {
                return Err(ConfigError::InvalidOfficeHours {
                    weekday: weekday_name(weekday).to_string(),
                    start: day.start.format("%H:%M").to_string(),
                    end: day.end.format("%H:%M").to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Outcome of an office-hours check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoursCheck {
    pub within: bool,
    pub reason: Option<String>,
}

impl HoursCheck {
    fn inside() -> Self {
        Self {
            within: true,
            reason: None,
        }
    }

    fn outside(reason: String) -> Self {
        Self {
            within: false,
            reason: Some(reason),
        }
    }
}

/// Decide whether `instant` falls inside the working window of its local weekday.
///
/// Malformed entries (missing day, `start >= end`) fail closed.
pub fn is_within_office_hours(instant: Instant, hours: &WeeklyOfficeHours, tz: Tz) -> HoursCheck {
    let local = instant.with_timezone(&tz);
    let weekday = local.weekday();

    let day = match hours.get(weekday) {
        Some(day) if day.is_well_formed() => day,
        _ => return HoursCheck::outside(INVALID_CONFIGURATION.to_string()),
    };

    if !day.enabled {
        return HoursCheck::outside(format!("closed on {}", weekday_name(weekday)));
    }

    let time = local.time();
    if day.start <= time && time < day.end {
        HoursCheck::inside()
    } else {
        HoursCheck::outside(outside_reason(day, tz))
    }
}

/// Decide whether the whole of `window` sits inside one working interval.
///
/// The start must be within hours and the end must fall on the same local
/// date, no later than closing time.
pub fn window_within_office_hours(
    window: &TimeWindow,
    hours: &WeeklyOfficeHours,
    tz: Tz,
) -> HoursCheck {
    let start_check = is_within_office_hours(window.start(), hours, tz);
    if !start_check.within {
        return start_check;
    }

    let local_start = window.start().with_timezone(&tz);
    let local_end = window.end().with_timezone(&tz);
    let day = match hours.get(local_start.weekday()) {
        Some(day) => day,
        None => return HoursCheck::outside(INVALID_CONFIGURATION.to_string()),
    };

    if local_end.date_naive() != local_start.date_naive() || local_end.time() > day.end {
        return HoursCheck::outside(outside_reason(day, tz));
    }
    HoursCheck::inside()
}

fn outside_reason(day: &DayHours, tz: Tz) -> String {
    format!(
        "outside hours ({}–{} {})",
        day.start.format("%H:%M"),
        day.end.format("%H:%M"),
        tz.name()
    )
}

/// Full English weekday name.
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parse a weekday name such as `"mon"` or `"Monday"`.
///
/// # Errors
///
/// [`ConfigError::UnknownWeekday`] for anything else.
pub fn parse_weekday(name: &str) -> Result<Weekday, ConfigError> {
    Weekday::from_str(name.trim()).map_err(|_| ConfigError::UnknownWeekday(name.to_string()))
}

/// Parse `HH:MM` or `HH:MM:SS`.
///
/// # Errors
///
/// [`ConfigError::InvalidValue`] naming `key` when the string is not a time of day.
pub fn parse_local_time(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("'{}' is not a time of day: {}", value, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const MELBOURNE: Tz = chrono_tz::Australia::Melbourne;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    /// Melbourne wall-clock instant in March 2026 (AEDT, +11:00).
    fn local(day: u32, h: u32, m: u32) -> Instant {
        MELBOURNE
            .with_ymd_and_hms(2026, 3, day, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn office() -> WeeklyOfficeHours {
        WeeklyOfficeHours::weekdays(t(9, 0), t(17, 0))
    }

    #[test]
    fn test_inside_hours() {
        // 2026-03-17 is a Tuesday.
        let check = is_within_office_hours(local(17, 10, 0), &office(), MELBOURNE);
        assert!(check.within);
        assert!(check.reason.is_none());
    }

    #[test]
    fn test_half_open_boundaries() {
        assert!(is_within_office_hours(local(17, 9, 0), &office(), MELBOURNE).within);
        assert!(!is_within_office_hours(local(17, 17, 0), &office(), MELBOURNE).within);
        assert!(!is_within_office_hours(local(17, 8, 59), &office(), MELBOURNE).within);
    }

    #[test]
    fn test_outside_reason_names_hours_and_zone() {
        let check = is_within_office_hours(local(17, 18, 0), &office(), MELBOURNE);
        assert!(!check.within);
        assert_eq!(
            check.reason.as_deref(),
            Some("outside hours (09:00–17:00 Australia/Melbourne)")
        );
    }

    #[test]
    fn test_closed_day() {
        // 2026-03-21 is a Saturday.
        let check = is_within_office_hours(local(21, 10, 0), &office(), MELBOURNE);
        assert!(!check.within);
        assert_eq!(check.reason.as_deref(), Some("closed on Saturday"));
    }

    #[test]
    fn test_disabled_day_ignores_start_and_end() {
        let all_day = DayHours {
            start: NaiveTime::MIN,
            end: t(23, 59),
            enabled: false,
        };
        let hours = office().with_day(Weekday::Sat, all_day);
        for hour in 0..24 {
            let check = is_within_office_hours(local(21, hour, 0), &hours, MELBOURNE);
            assert!(!check.within, "Saturday {}:00 should be closed", hour);
        }
    }

    #[test]
    fn test_uses_agent_timezone_not_utc() {
        // 10:00 Melbourne on Tuesday is 23:00 UTC on Monday.
        let instant = local(17, 10, 0);
        assert_eq!(instant.weekday(), Weekday::Mon);
        assert!(is_within_office_hours(instant, &office(), MELBOURNE).within);
        assert!(!is_within_office_hours(instant, &office(), Tz::UTC).within);
    }

    #[test]
    fn test_midnight_crossing_fails_closed() {
        let hours = office().with_day(Weekday::Tue, DayHours::open(t(22, 0), t(2, 0)));
        let check = is_within_office_hours(local(17, 23, 0), &hours, MELBOURNE);
        assert!(!check.within);
        assert_eq!(check.reason.as_deref(), Some(INVALID_CONFIGURATION));
        assert!(matches!(
            hours.validate(),
            Err(ConfigError::InvalidOfficeHours { .. })
        ));
    }

    #[test]
    fn test_missing_weekday() {
        let hours = WeeklyOfficeHours::new().with_day(Weekday::Mon, DayHours::open(t(9, 0), t(17, 0)));
        assert!(matches!(hours.validate(), Err(ConfigError::MissingWeekday(day)) if day == "Tuesday"));
        let check = is_within_office_hours(local(17, 10, 0), &hours, MELBOURNE);
        assert_eq!(check.reason.as_deref(), Some(INVALID_CONFIGURATION));
    }

    #[test]
    fn test_window_must_end_by_closing() {
        let ok = TimeWindow::new(local(17, 16, 0), local(17, 17, 0)).unwrap();
        assert!(window_within_office_hours(&ok, &office(), MELBOURNE).within);

        let late = TimeWindow::new(local(17, 16, 30), local(17, 17, 30)).unwrap();
        let check = window_within_office_hours(&late, &office(), MELBOURNE);
        assert!(!check.within);
        assert!(check.reason.unwrap().starts_with("outside hours"));

        let overnight = TimeWindow::new(local(17, 16, 0), local(18, 10, 0)).unwrap();
        assert!(!window_within_office_hours(&overnight, &office(), MELBOURNE).within);
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_weekday("mon").unwrap(), Weekday::Mon);
        assert_eq!(parse_weekday("Saturday").unwrap(), Weekday::Sat);
        assert!(matches!(parse_weekday("Funday"), Err(ConfigError::UnknownWeekday(_))));

        assert_eq!(parse_local_time("start", "09:30").unwrap(), t(9, 30));
        assert_eq!(parse_local_time("start", "17:00:00").unwrap(), t(17, 0));
        assert!(parse_local_time("start", "25:00").is_err());
    }
}
