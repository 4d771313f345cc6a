//! # booking-engine
//!
//! Availability resolution and booking for appointment scheduling.
//!
//! ## Overview
//!
//! Given a requested window, an agent's weekly office hours in their own
//! timezone, the busy intervals on their calendar and a tenant lead-time
//! policy, the engine decides whether the window can be booked. When it
//! cannot, it says why and suggests the nearest free windows.
//!
//! ## Core Concepts
//!
//! - **Instants**: every time is a UTC instant; wall-clock time only exists
//!   inside the office-hours check
//! - **Half-open windows**: back-to-back bookings never conflict
//! - **Verdicts, not errors**: "not available" is a normal outcome
//! - **Single-pass booking**: no retries inside the engine; backends decide
//!
//! ## Example
//!
//! ```rust,ignore
//! use booking_engine::{BookingOrchestrator, BookingRequest, Attendee, EngineConfig};
//!
//! let config = EngineConfig::load("engine.json")?;
//! let engine = BookingOrchestrator::from_config(&config, providers, Arc::new(SystemClock))?;
//! let outcome = engine
//!     .book(&BookingRequest::new("acme", "2026-03-17T10:00", "2026-03-17T10:30",
//!         Attendee::new("Sam").with_email("sam@example.com")))
//!     .await;
//! ```

pub mod types;
pub mod error;
pub mod clock;
pub mod availability;
pub mod providers;
pub mod directory;
pub mod booking;
pub mod cli;

// Re-export commonly used types
pub use types::{
    Attendee,
    AvailabilityVerdict,
    BookingRequest,
    BusyInterval,
    Confidence,
    Instant,
    SlotCandidate,
    TimeWindow,
    Unavailability,
};
pub use error::{Error, Result};
pub use availability::{find_slots, SearchParams, WeeklyOfficeHours};
pub use booking::{BookingOrchestrator, BookingOutcome, BookingRejection, EngineConfig};
pub use clock::{Clock, FixedClock, SystemClock};
pub use directory::{AgentProfile, TenantDirectory};
pub use providers::{CalendarProvider, CalendarRef, ProviderKind, ProviderRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
