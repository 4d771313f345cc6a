//! Availability resolution.
//!
//! The pure half of the engine. Nothing in this module performs I/O, reads
//! the system clock or holds state between calls.
//!
//! ## Pipeline
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────┐   ┌─────────────┐
//! │ normalizer │──▶│ office_hours │──▶│ conflict │──▶│ slots       │
//! │ ISO → UTC  │   │ local check  │   │ overlap  │   │ verdict +   │
//! └────────────┘   └──────────────┘   └──────────┘   │ alternatives│
//!                                                    └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use booking_engine::availability::{find_slots, normalize_window, SearchParams, WeeklyOfficeHours};
//!
//! let tz = chrono_tz::Australia::Melbourne;
//! let hours = WeeklyOfficeHours::weekdays(nine, five);
//! let requested = normalize_window("2026-03-17T10:00", "2026-03-17T11:00", tz)?;
//! let verdict = find_slots(&requested, &hours, tz, &busy, clock.now(), &SearchParams::default())?;
//! ```

pub mod conflict;
pub mod normalizer;
pub mod office_hours;
pub mod slots;

pub use conflict::{excluding_event, first_conflict, has_conflict};
pub use normalizer::{normalize, normalize_window};
pub use office_hours::{
    is_within_office_hours, parse_local_time, parse_weekday, weekday_name,
    window_within_office_hours, DayHours, HoursCheck, WeeklyOfficeHours,
};
pub use slots::{find_slots, SearchParams, NO_SLOTS_REASON};

use chrono_tz::Tz;

use crate::error::ConfigError;

/// Parse an IANA timezone name such as `"Australia/Melbourne"`.
///
/// # Errors
///
/// [`ConfigError::UnknownTimezone`] when the name is not in the tz database.
pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
}
