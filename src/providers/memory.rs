//! In-memory calendar backend.
//!
//! Behaves like a real provider where it matters to the engine: it rejects
//! overlapping writes with [`ProviderError::Conflict`], can be told to fail
//! the next calls, and can simulate network latency. Used by the CLI and by
//! tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::{CalendarProvider, CalendarRef, CreatedEvent, EventDraft};
use crate::error::ProviderError;
use crate::types::{BusyInterval, TimeWindow};

#[derive(Debug, Clone)]
struct StoredEvent {
    id: String,
    window: TimeWindow,
}

/// Calendar backend kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryCalendar {
    events: RwLock<HashMap<CalendarRef, Vec<StoredEvent>>>,
    failures: Mutex<VecDeque<ProviderError>>,
    latency: Option<Duration>,
    allow_overlaps: bool,
}

impl InMemoryCalendar {
    /// Create an empty calendar store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Accept overlapping writes instead of reporting a conflict.
    pub fn allowing_overlaps(mut self) -> Self {
        self.allow_overlaps = true;
        self
    }

    /// Insert an existing event without any checks. Returns its id.
    pub async fn seed(&self, calendar: &CalendarRef, window: TimeWindow) -> String {
        let id = new_event_id();
        self.events
            .write()
            .await
            .entry(calendar.clone())
            .or_default()
            .push(StoredEvent {
                id: id.clone(),
                window,
            });
        id
    }

    /// Make the next call fail with `error`. Failures queue up in order.
    pub async fn fail_next(&self, error: ProviderError) {
        self.failures.lock().await.push_back(error);
    }

    /// Number of events stored for a calendar.
    pub async fn event_count(&self, calendar: &CalendarRef) -> usize {
        self.events
            .read()
            .await
            .get(calendar)
            .map_or(0, |events| events.len())
    }

    /// Stored events for a calendar, ordered by start.
    pub async fn events(&self, calendar: &CalendarRef) -> Vec<(String, TimeWindow)> {
        let mut events: Vec<_> = self
            .events
            .read()
            .await
            .get(calendar)
            .map(|events| events.iter().map(|e| (e.id.clone(), e.window)).collect())
            .unwrap_or_default();
        events.sort_by_key(|(_, window)| window.start());
        events
    }

    async fn simulate_call(&self) -> Result<(), ProviderError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.failures.lock().await.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn check_overlap(
        &self,
        existing: &[StoredEvent],
        window: &TimeWindow,
        ignore_id: Option<&str>,
    ) -> Result<(), ProviderError> {
        if self.allow_overlaps {
            return Ok(());
        }
        let clash = existing
            .iter()
            .filter(|event| Some(event.id.as_str()) != ignore_id)
            .find(|event| event.window.overlaps(window));
        match clash {
            Some(event) => Err(ProviderError::Conflict(format!(
                "{} overlaps event {}",
                window, event.id
            ))),
            None => Ok(()),
        }
    }
}

fn new_event_id() -> String {
    format!("evt_{}", uuid::Uuid::new_v4().simple())
}

fn validate_draft(draft: &EventDraft) -> Result<(), ProviderError> {
    if let Some(email) = draft.attendee.email.as_deref() {
        if !email.contains('@') {
            return Err(ProviderError::InvalidAttendee(format!(
                "'{}' is not an email address",
                email
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl CalendarProvider for InMemoryCalendar {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_busy_intervals(
        &self,
        calendar: &CalendarRef,
        window_hint: &TimeWindow,
    ) -> Result<Vec<BusyInterval>, ProviderError> {
        self.simulate_call().await?;
        let events = self.events.read().await;
        let busy: Vec<BusyInterval> = events
            .get(calendar)
            .map(|events| {
                events
                    .iter()
                    .filter(|event| event.window.overlaps(window_hint))
                    .map(|event| BusyInterval::new(event.window).with_event_id(event.id.clone()))
                    .collect()
            })
            .unwrap_or_default();
        debug!(calendar = %calendar, count = busy.len(), "Fetched busy intervals");
        Ok(busy)
    }

    async fn create_event(
        &self,
        calendar: &CalendarRef,
        draft: &EventDraft,
    ) -> Result<CreatedEvent, ProviderError> {
        self.simulate_call().await?;
        validate_draft(draft)?;

        let mut events = self.events.write().await;
        let existing = events.entry(calendar.clone()).or_default();
        self.check_overlap(existing, &draft.window, None)?;

        let id = new_event_id();
        existing.push(StoredEvent {
            id: id.clone(),
            window: draft.window,
        });
        debug!(calendar = %calendar, event_id = %id, "Created event");
        Ok(CreatedEvent {
            event_id: id,
            canonical_window: draft.window,
        })
    }

    async fn update_event(
        &self,
        calendar: &CalendarRef,
        event_id: &str,
        draft: &EventDraft,
    ) -> Result<CreatedEvent, ProviderError> {
        self.simulate_call().await?;
        validate_draft(draft)?;

        let mut events = self.events.write().await;
        let existing = events
            .get_mut(calendar)
            .ok_or_else(|| ProviderError::EventNotFound(event_id.to_string()))?;
        self.check_overlap(existing, &draft.window, Some(event_id))?;

        let event = existing
            .iter_mut()
            .find(|event| event.id == event_id)
            .ok_or_else(|| ProviderError::EventNotFound(event_id.to_string()))?;
        event.window = draft.window;
        debug!(calendar = %calendar, event_id, "Updated event");
        Ok(CreatedEvent {
            event_id: event_id.to_string(),
            canonical_window: draft.window,
        })
    }

    async fn delete_event(
        &self,
        calendar: &CalendarRef,
        event_id: &str,
    ) -> Result<(), ProviderError> {
        self.simulate_call().await?;
        let mut events = self.events.write().await;
        let existing = events
            .get_mut(calendar)
            .ok_or_else(|| ProviderError::EventNotFound(event_id.to_string()))?;
        let before = existing.len();
        existing.retain(|event| event.id != event_id);
        if existing.len() == before {
            return Err(ProviderError::EventNotFound(event_id.to_string()));
        }
        debug!(calendar = %calendar, event_id, "Deleted event");
        Ok(())
    }
}
