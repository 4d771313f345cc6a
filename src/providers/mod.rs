//! Calendar provider collaborators.
//!
//! Providers connect the engine to external calendars: a Graph-style
//! calendar API and a booking platform. Each backend implements
//! [`CalendarProvider`]; the engine only sees busy intervals and event ids.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │  BookingOrchestrator │────▶│   ProviderRegistry   │
//! └──────────────────────┘     │  graph │ booking_pf  │
//!                              └────┬─────────┬───────┘
//!                                   ↓         ↓
//!                      RetryingCalendar<P>   InMemoryCalendar
//! ```
//!
//! Retries live here, in the collaborator layer. The orchestrator makes a
//! single pass and reports whatever the provider returns.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::types::{Attendee, BusyInterval, TimeWindow};

pub mod common;
pub mod memory;

pub use common::{with_retry, RetryPolicy, RetryResult, RetryingCalendar};
pub use memory::InMemoryCalendar;

/// Supported calendar backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Graph-style calendar API (mailbox calendars).
    Graph,
    /// Hosted booking platform.
    BookingPlatform,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Graph => "graph",
            ProviderKind::BookingPlatform => "booking_platform",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "graph" => Ok(ProviderKind::Graph),
            "booking_platform" | "booking-platform" => Ok(ProviderKind::BookingPlatform),
            other => Err(format!("unknown calendar provider '{}'", other)),
        }
    }
}

/// Which calendar, on which backend, a booking is made against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarRef {
    pub provider: ProviderKind,
    pub calendar_id: String,
}

impl CalendarRef {
    pub fn new(provider: ProviderKind, calendar_id: &str) -> Self {
        Self {
            provider,
            calendar_id: calendar_id.to_string(),
        }
    }
}

impl fmt::Display for CalendarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.calendar_id)
    }
}

/// Event to create or move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    pub window: TimeWindow,
    pub attendee: Attendee,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// What a provider returns after writing an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub event_id: String,
    /// The window as the provider stored it.
    pub canonical_window: TimeWindow,
}

/// Trait that all calendar backends implement.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Backend identifier used in logs.
    fn name(&self) -> &str;

    /// Busy periods on `calendar` overlapping `window_hint`.
    async fn fetch_busy_intervals(
        &self,
        calendar: &CalendarRef,
        window_hint: &TimeWindow,
    ) -> Result<Vec<BusyInterval>, ProviderError>;

    /// Create an event. Overlaps detected by the backend come back as
    /// [`ProviderError::Conflict`].
    async fn create_event(
        &self,
        calendar: &CalendarRef,
        draft: &EventDraft,
    ) -> Result<CreatedEvent, ProviderError>;

    /// Move or edit an existing event.
    async fn update_event(
        &self,
        calendar: &CalendarRef,
        event_id: &str,
        draft: &EventDraft,
    ) -> Result<CreatedEvent, ProviderError>;

    /// Remove an event.
    async fn delete_event(&self, calendar: &CalendarRef, event_id: &str)
        -> Result<(), ProviderError>;
}

/// Registry of calendar backends keyed by [`ProviderKind`].
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn CalendarProvider>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend, replacing any previous one for `kind`.
    pub fn register<P: CalendarProvider + 'static>(&mut self, kind: ProviderKind, provider: P) {
        self.providers.insert(kind, Arc::new(provider));
    }

    /// Register an already shared backend.
    pub fn register_shared(&mut self, kind: ProviderKind, provider: Arc<dyn CalendarProvider>) {
        self.providers.insert(kind, provider);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<P: CalendarProvider + 'static>(mut self, kind: ProviderKind, provider: P) -> Self {
        self.register(kind, provider);
        self
    }

    /// Get the backend for a calendar.
    ///
    /// # Errors
    ///
    /// [`ProviderError::NotRegistered`] when no backend serves `calendar.provider`.
    pub fn resolve(&self, calendar: &CalendarRef) -> Result<Arc<dyn CalendarProvider>, ProviderError> {
        self.providers
            .get(&calendar.provider)
            .cloned()
            .ok_or_else(|| ProviderError::NotRegistered(calendar.provider.to_string()))
    }

    /// Check if a backend is registered.
    pub fn has(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }
}
