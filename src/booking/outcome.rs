//! Terminal results of a booking attempt.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::error::{ConfigError, DirectoryError, NormalizeError, ProviderError};
use crate::types::{AvailabilityVerdict, Instant, SlotCandidate, TimeWindow, Unavailability};

/// Stages a booking attempt passes through, in order. None is re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingPhase {
    Validating,
    CheckingAvailability,
    Creating,
}

impl fmt::Display for BookingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingPhase::Validating => "validating",
            BookingPhase::CheckingAvailability => "checking_availability",
            BookingPhase::Creating => "creating",
        };
        f.write_str(name)
    }
}

/// Why a request ended without an event being written.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookingRejection {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("too soon; earliest allowed start is {earliest_allowed}")]
    TooSoon {
        earliest_allowed: Instant,
        alternatives: Vec<SlotCandidate>,
    },

    #[error("in the past; earliest allowed start is {earliest_allowed}")]
    InThePast {
        earliest_allowed: Instant,
        alternatives: Vec<SlotCandidate>,
    },

    #[error("out of office hours: {reason}")]
    OutOfOfficeHours {
        reason: String,
        alternatives: Vec<SlotCandidate>,
    },

    /// `detected_by_provider` is set when our own check passed but the
    /// calendar refused the write.
    #[error("conflicts with an existing booking")]
    Conflict {
        alternatives: Vec<SlotCandidate>,
        detected_by_provider: bool,
    },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("provider error: {message}")]
    Provider { message: String, transient: bool },
}

impl BookingRejection {
    pub fn kind(&self) -> &'static str {
        match self {
            BookingRejection::InvalidInput { .. } => "invalid_input",
            BookingRejection::TooSoon { .. } => "too_soon",
            BookingRejection::InThePast { .. } => "in_the_past",
            BookingRejection::OutOfOfficeHours { .. } => "out_of_office_hours",
            BookingRejection::Conflict { .. } => "conflict",
            BookingRejection::Configuration { .. } => "configuration",
            BookingRejection::Provider { .. } => "provider",
        }
    }

    /// Suggested windows, if this rejection carries any.
    pub fn alternatives(&self) -> &[SlotCandidate] {
        match self {
            BookingRejection::TooSoon { alternatives, .. }
            | BookingRejection::InThePast { alternatives, .. }
            | BookingRejection::OutOfOfficeHours { alternatives, .. }
            | BookingRejection::Conflict { alternatives, .. } => alternatives,
            _ => &[],
        }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        BookingRejection::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Turn an unavailable verdict into the matching rejection.
    ///
    /// Returns `None` for an available verdict.
    pub fn from_verdict(verdict: AvailabilityVerdict) -> Option<Self> {
        let alternatives = verdict.alternatives;
        let rejection = match verdict.unavailability? {
            Unavailability::TooSoon { earliest_allowed } => BookingRejection::TooSoon {
                earliest_allowed,
                alternatives,
            },
            Unavailability::InThePast { earliest_allowed } => BookingRejection::InThePast {
                earliest_allowed,
                alternatives,
            },
            Unavailability::OutOfOfficeHours { reason } => BookingRejection::OutOfOfficeHours {
                reason,
                alternatives,
            },
            Unavailability::Conflict => BookingRejection::Conflict {
                alternatives,
                detected_by_provider: false,
            },
        };
        Some(rejection)
    }
}

impl From<NormalizeError> for BookingRejection {
    fn from(err: NormalizeError) -> Self {
        BookingRejection::invalid_input(err.to_string())
    }
}

impl From<ConfigError> for BookingRejection {
    fn from(err: ConfigError) -> Self {
        BookingRejection::Configuration {
            reason: err.to_string(),
        }
    }
}

impl From<ProviderError> for BookingRejection {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Conflict(_) => BookingRejection::Conflict {
                alternatives: Vec::new(),
                detected_by_provider: true,
            },
            ProviderError::NotRegistered(_) => BookingRejection::Configuration {
                reason: err.to_string(),
            },
            other => BookingRejection::Provider {
                transient: other.is_transient(),
                message: other.to_string(),
            },
        }
    }
}

impl From<DirectoryError> for BookingRejection {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Config(config) => config.into(),
            other => BookingRejection::invalid_input(other.to_string()),
        }
    }
}

/// Final state of one booking attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BookingOutcome {
    Confirmed { event_id: String, window: TimeWindow },
    Rejected(BookingRejection),
}

impl BookingOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, BookingOutcome::Confirmed { .. })
    }

    pub fn rejection(&self) -> Option<&BookingRejection> {
        match self {
            BookingOutcome::Rejected(rejection) => Some(rejection),
            BookingOutcome::Confirmed { .. } => None,
        }
    }
}

impl From<BookingRejection> for BookingOutcome {
    fn from(rejection: BookingRejection) -> Self {
        BookingOutcome::Rejected(rejection)
    }
}
