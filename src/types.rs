//! Core types for the booking engine.
//!
//! Every value here is created per request and discarded once the response
//! is produced. Instants are always `DateTime<Utc>`; local wall-clock time
//! only appears inside the office-hours evaluator.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::NormalizeError;

/// An absolute point in time.
pub type Instant = DateTime<Utc>;

/// Half-open time range `[start, end)` with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WindowRepr")]
pub struct TimeWindow {
    start: Instant,
    end: Instant,
}

#[derive(Deserialize)]
struct WindowRepr {
    start: Instant,
    end: Instant,
}

impl TryFrom<WindowRepr> for TimeWindow {
    type Error = NormalizeError;

    fn try_from(repr: WindowRepr) -> Result<Self, Self::Error> {
        TimeWindow::new(repr.start, repr.end)
    }
}

impl TimeWindow {
    /// Create a window, rejecting `end <= start`.
    pub fn new(start: Instant, end: Instant) -> Result<Self, NormalizeError> {
        if end <= start {
            return Err(NormalizeError::EmptyWindow {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// Create a window from a start and a positive length.
    pub fn starting_at(start: Instant, length: Duration) -> Result<Self, NormalizeError> {
        let end = start
            .checked_add_signed(length)
            .ok_or_else(|| NormalizeError::InvalidDateTime {
                input: format!("{} + {}", start, length),
                reason: "end is outside the supported date range".to_string(),
            })?;
        Self::new(start, end)
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn end(&self) -> Instant {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open overlap: windows that merely touch do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// An already-booked period reported by a calendar provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub window: TimeWindow,

    /// Provider event id, when the provider exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl BusyInterval {
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            event_id: None,
        }
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }
}

/// Confidence score (0.0 to 1.0) attached to a suggested slot.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Confidence(f32);

impl Confidence {
    /// Create a new confidence score, clamped to [0.0, 1.0].
    pub fn new(value: f32) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// Confidence for a slot `steps` search increments after the requested start.
    pub fn from_distance(steps: u32) -> Self {
        Self::new(1.0 / (1.0 + steps as f32))
    }

    /// Get the confidence value.
    pub fn value(&self) -> f32 {
        self.0
    }

    /// Full confidence (1.0).
    pub fn full() -> Self {
        Self(1.0)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A suggested alternative window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotCandidate {
    pub window: TimeWindow,
    pub confidence: Confidence,
}

/// Why a requested window cannot be booked as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Unavailability {
    /// Starts inside the lead-time window.
    TooSoon { earliest_allowed: Instant },

    /// Starts before "now".
    InThePast { earliest_allowed: Instant },

    /// Not fully inside one working interval.
    OutOfOfficeHours { reason: String },

    /// Overlaps a busy interval.
    Conflict,
}

impl Unavailability {
    pub fn kind(&self) -> &'static str {
        match self {
            Unavailability::TooSoon { .. } => "too_soon",
            Unavailability::InThePast { .. } => "in_the_past",
            Unavailability::OutOfOfficeHours { .. } => "out_of_office_hours",
            Unavailability::Conflict => "conflict",
        }
    }
}

/// The result of resolving a requested window. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityVerdict {
    pub is_available: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailability: Option<Unavailability>,

    /// Earliest start the lead-time policy allows for this request.
    pub earliest_allowed: Instant,

    pub alternatives: Vec<SlotCandidate>,
}

impl AvailabilityVerdict {
    pub fn available(earliest_allowed: Instant) -> Self {
        Self {
            is_available: true,
            reason: None,
            unavailability: None,
            earliest_allowed,
            alternatives: Vec::new(),
        }
    }

    pub fn unavailable(
        unavailability: Unavailability,
        reason: String,
        earliest_allowed: Instant,
        alternatives: Vec<SlotCandidate>,
    ) -> Self {
        Self {
            is_available: false,
            reason: Some(reason),
            unavailability: Some(unavailability),
            earliest_allowed,
            alternatives,
        }
    }
}

/// Contact details of the person being booked in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Attendee {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self
    }

    /// Whether at least one contact channel is present.
    pub fn has_contact(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.email) || present(&self.phone)
    }
}

/// A booking attempt as received from a tool invocation.
///
/// Times are kept as the caller sent them; the orchestrator normalizes them
/// in the agent's timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub tenant_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    pub start: String,

    pub end: String,

    pub attendee: Attendee,

    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl BookingRequest {
    pub fn new(tenant_id: &str, start: &str, end: &str, attendee: Attendee) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            agent_id: None,
            start: start.to_string(),
            end: end.to_string(),
            attendee,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_agent(mut self, agent_id: &str) -> Self {
        self.agent_id = Some(agent_id.to_string());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
