//! Helpers for the command-line interface.
//!
//! The CLI runs the engine against an in-memory calendar seeded from a JSON
//! busy file, so bookings can be tried without a real backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::availability::{normalize, normalize_window};
use crate::clock::{Clock, FixedClock, SystemClock};
use crate::error::{ConfigError, Result};
use crate::providers::{CalendarRef, InMemoryCalendar, ProviderKind, ProviderRegistry};

/// Expand tilde (~) in paths.
pub fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

/// One existing booking in a busy file. Times without an offset are read in
/// the agent's timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusyEntry {
    pub start: String,
    pub end: String,
}

/// Read a JSON array of [`BusyEntry`].
pub fn load_busy_file(path: &Path) -> Result<Vec<BusyEntry>> {
    let expanded = expand_path(path);
    if !expanded.exists() {
        return Err(ConfigError::FileNotFound(expanded.display().to_string()).into());
    }
    let contents = std::fs::read_to_string(&expanded)?;
    Ok(serde_json::from_str(&contents)?)
}

/// An in-memory calendar holding `entries` on `calendar`.
pub async fn seeded_calendar(
    entries: &[BusyEntry],
    calendar: &CalendarRef,
    tz: Tz,
) -> Result<InMemoryCalendar> {
    let memory = InMemoryCalendar::new();
    for entry in entries {
        let window = normalize_window(&entry.start, &entry.end, tz)?;
        memory.seed(calendar, window).await;
    }
    tracing::debug!(calendar = %calendar, count = entries.len(), "Seeded in-memory calendar");
    Ok(memory)
}

/// Registry serving every provider kind from the same in-memory calendar.
pub fn memory_registry(memory: Arc<InMemoryCalendar>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for kind in [ProviderKind::Graph, ProviderKind::BookingPlatform] {
        registry.register_shared(kind, memory.clone());
    }
    registry
}

/// The wall clock, or a clock pinned to `now` (RFC 3339) when given.
pub fn clock_from(now: Option<&str>) -> Result<Arc<dyn Clock>> {
    match now {
        Some(now) => Ok(Arc::new(FixedClock::new(normalize(now, Tz::UTC)?))),
        None => Ok(Arc::new(SystemClock)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::Write;

    #[test]
    fn test_expand_path() {
        let plain = Path::new("/etc/engine.json");
        assert_eq!(expand_path(plain), plain.to_path_buf());

        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(
                expand_path(Path::new("~/engine.json")),
                PathBuf::from(home).join("engine.json")
            );
        }
    }

    #[tokio::test]
    async fn test_busy_file_seeds_calendar() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"start": "2026-03-17T10:00", "end": "2026-03-17T10:30"}},
                {{"start": "2026-03-17T01:00:00Z", "end": "2026-03-17T02:00:00Z"}}]"#
        )
        .unwrap();

        let entries = load_busy_file(file.path()).unwrap();
        assert_eq!(entries.len(), 2);

        let calendar = CalendarRef::new(ProviderKind::Graph, "alex");
        let memory = seeded_calendar(&entries, &calendar, chrono_tz::Australia::Melbourne)
            .await
            .unwrap();
        let events = memory.events(&calendar).await;
        // 10:00 in Melbourne (AEDT) is 23:00 UTC the day before.
        assert_eq!(
            events[0].1.start(),
            Utc.with_ymd_and_hms(2026, 3, 16, 23, 0, 0).unwrap()
        );
        assert_eq!(
            events[1].1.start(),
            Utc.with_ymd_and_hms(2026, 3, 17, 1, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_missing_busy_file() {
        assert!(load_busy_file(Path::new("/no/such/busy.json")).is_err());
    }

    #[tokio::test]
    async fn test_bad_busy_entry() {
        let entries = vec![BusyEntry {
            start: "2026-03-17T11:00".into(),
            end: "2026-03-17T10:00".into(),
        }];
        let calendar = CalendarRef::new(ProviderKind::Graph, "alex");
        assert!(seeded_calendar(&entries, &calendar, Tz::UTC).await.is_err());
    }

    #[test]
    fn test_clock_from() {
        let fixed = clock_from(Some("2026-03-16T08:00:00+11:00")).unwrap();
        assert_eq!(fixed.now(), Utc.with_ymd_and_hms(2026, 3, 15, 21, 0, 0).unwrap());
        assert!(clock_from(Some("yesterday")).is_err());
        assert!(clock_from(None).is_ok());
    }

    #[test]
    fn test_memory_registry_serves_all_kinds() {
        let registry = memory_registry(Arc::new(InMemoryCalendar::new()));
        assert!(registry.has(ProviderKind::Graph));
        assert!(registry.has(ProviderKind::BookingPlatform));
    }
}
