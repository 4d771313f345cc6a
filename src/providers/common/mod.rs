//! Shared plumbing for calendar providers.
//!
//! Retry with exponential backoff, and a decorator that applies it to any
//! [`CalendarProvider`](super::CalendarProvider).

pub mod retry;

pub use retry::{with_retry, RetryPolicy, RetryResult, RetryingCalendar};
