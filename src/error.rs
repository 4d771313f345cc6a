//! Error types for the booking engine.
//!
//! Configuration, normalization, provider and directory failures each get
//! their own enum. "Not available" is never an error: it is carried by
//! [`AvailabilityVerdict`](crate::types::AvailabilityVerdict) instead.

use thiserror::Error;

/// Main error type for booking engine operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Date-time normalization errors
    #[error("Invalid input: {0}")]
    Normalize(#[from] NormalizeError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Calendar provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Tenant directory errors
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the booking engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while turning caller input into instants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("invalid date-time '{input}': {reason}")]
    InvalidDateTime { input: String, reason: String },

    #[error("window end {end} must be after start {start}")]
    EmptyWindow { start: String, end: String },
}

/// Errors related to configuration, including malformed office hours.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid config value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing required config: {0}")]
    MissingRequired(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Unknown weekday: {0}")]
    UnknownWeekday(String),

    #[error("No office hours entry for {0}")]
    MissingWeekday(String),

    #[error("Office hours on {weekday} start at {start} but end at {end}")]
    InvalidOfficeHours {
        weekday: String,
        start: String,
        end: String,
    },
}

/// Errors reported by a calendar collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("timeout")]
    Timeout,

    /// The provider itself detected an overlapping event.
    #[error("Provider reported a conflicting event: {0}")]
    Conflict(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Invalid attendee: {0}")]
    InvalidAttendee(String),

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("No provider registered for {0}")]
    NotRegistered(String),

    #[error("Unexpected provider response: {0}")]
    UnexpectedResponse(String),
}

impl ProviderError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout => true,
            ProviderError::RateLimited { .. } => true,
            ProviderError::Unavailable(_) => true,
            ProviderError::Conflict(_) => false,
            ProviderError::Unauthorized(_) => false,
            ProviderError::InvalidAttendee(_) => false,
            ProviderError::EventNotFound(_) => false,
            ProviderError::CalendarNotFound(_) => false,
            ProviderError::NotRegistered(_) => false,
            ProviderError::UnexpectedResponse(_) => false,
        }
    }
}

/// Errors related to tenant and agent lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Agent '{agent}' not found for tenant '{tenant}'")]
    AgentNotFound { tenant: String, agent: String },

    #[error("Tenant '{0}' has no default agent")]
    NoDefaultAgent(String),

    #[error("Invalid directory entry: {0}")]
    Config(#[from] ConfigError),
}
