//! Booking orchestration.
//!
//! Drives one request through a fixed, single-pass state machine:
//!
//! ```text
//!  ┌────────────┐    ┌──────────────────────┐    ┌──────────┐
//!  │ Validating │───▶│ CheckingAvailability │───▶│ Creating │───▶ Confirmed
//!  └─────┬──────┘    └──────────┬───────────┘    └────┬─────┘
//!        ↓                      ↓                     ↓
//!  Rejected(InvalidInput)  Rejected(TooSoon |    Rejected(Conflict,
//!                          InThePast | Conflict  detected_by_provider)
//!                          | OutOfOfficeHours)   | Rejected(Provider)
//! ```
//!
//! Every collaborator call of a request shares one deadline. The orchestrator
//! never retries; wrap a backend in
//! [`RetryingCalendar`](crate::providers::RetryingCalendar) for that.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant as Deadline;
use tracing::{debug, info, instrument, warn};

pub mod config;
pub mod outcome;

pub use config::EngineConfig;
pub use outcome::{BookingOutcome, BookingPhase, BookingRejection};

use crate::availability::{excluding_event, find_slots, normalize_window, SearchParams};
use crate::clock::Clock;
use crate::directory::{AgentProfile, CachedDirectory, StaticDirectory, TenantDirectory};
use crate::error::{ConfigError, ProviderError};
use crate::providers::{CalendarProvider, EventDraft, ProviderRegistry};
use crate::types::{AvailabilityVerdict, BookingRequest, Instant, TimeWindow};

/// Default deadline for all collaborator calls of one request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything resolved during `Validating`.
struct Prepared {
    profile: AgentProfile,
    provider: Arc<dyn CalendarProvider>,
    window: TimeWindow,
    params: SearchParams,
    now: Instant,
}

/// Runs availability checks and bookings against tenant calendars.
pub struct BookingOrchestrator {
    providers: ProviderRegistry,
    directory: Arc<dyn TenantDirectory>,
    clock: Arc<dyn Clock>,
    params: SearchParams,
    request_timeout: Duration,
}

impl BookingOrchestrator {
    pub fn new(
        providers: ProviderRegistry,
        directory: Arc<dyn TenantDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            providers,
            directory,
            clock,
            params: SearchParams::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Build an orchestrator whose directory comes from `config.tenants`,
    /// cached when `config.cache.enabled`.
    ///
    /// # Errors
    ///
    /// Any validation failure in `config`.
    pub fn from_config(
        config: &EngineConfig,
        providers: ProviderRegistry,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let directory = StaticDirectory::from_config(config)?;
        let directory: Arc<dyn TenantDirectory> = if config.cache.enabled {
            Arc::new(CachedDirectory::new(directory, config.cache_ttl(), clock.clone()))
        } else {
            Arc::new(directory)
        };

        Ok(Self::new(providers, directory, clock)
            .with_search_params(config.search_params())
            .with_request_timeout(config.request_timeout()))
    }

    /// Step, horizon and suggestion count. The lead time is always taken
    /// from the tenant directory.
    pub fn with_search_params(mut self, params: SearchParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Resolve a window without writing anything.
    #[instrument(skip(self), fields(tenant = %tenant_id))]
    pub async fn check_availability(
        &self,
        tenant_id: &str,
        agent_id: Option<&str>,
        start: &str,
        end: &str,
    ) -> Result<AvailabilityVerdict, BookingRejection> {
        let deadline = self.deadline();
        let prepared = self.prepare(tenant_id, agent_id, start, end, deadline).await?;
        self.resolve(&prepared, None, deadline).await
    }

    /// Book the requested window.
    #[instrument(skip(self, request), fields(tenant = %request.tenant_id))]
    pub async fn book(&self, request: &BookingRequest) -> BookingOutcome {
        match self.run(request, None).await {
            Ok(outcome) => outcome,
            Err(rejection) => {
                info!(kind = rejection.kind(), %rejection, "Booking rejected");
                BookingOutcome::Rejected(rejection)
            }
        }
    }

    /// Move `event_id` to the requested window. The event's current slot
    /// does not count against the new one.
    #[instrument(skip(self, request), fields(tenant = %request.tenant_id))]
    pub async fn reschedule(&self, request: &BookingRequest, event_id: &str) -> BookingOutcome {
        if event_id.trim().is_empty() {
            return BookingRejection::invalid_input("event id is required").into();
        }
        match self.run(request, Some(event_id)).await {
            Ok(outcome) => outcome,
            Err(rejection) => {
                info!(kind = rejection.kind(), %rejection, "Reschedule rejected");
                BookingOutcome::Rejected(rejection)
            }
        }
    }

    /// Delete an event from the agent's calendar.
    #[instrument(skip(self), fields(tenant = %tenant_id))]
    pub async fn cancel(
        &self,
        tenant_id: &str,
        agent_id: Option<&str>,
        event_id: &str,
    ) -> Result<(), BookingRejection> {
        if tenant_id.trim().is_empty() {
            return Err(BookingRejection::invalid_input("tenant id is required"));
        }
        if event_id.trim().is_empty() {
            return Err(BookingRejection::invalid_input("event id is required"));
        }

        let deadline = self.deadline();
        let profile = bounded(deadline, async {
            Ok(self.directory.resolve_agent(tenant_id, agent_id).await)
        })
        .await??;
        let provider = self.providers.resolve(&profile.calendar)?;

        bounded(deadline, provider.delete_event(&profile.calendar, event_id))
            .await
            .map_err(|e| {
                warn!(calendar = %profile.calendar, event_id, error = %e, "Cancel failed");
                BookingRejection::from(e)
            })?;
        info!(calendar = %profile.calendar, event_id, "Event cancelled");
        Ok(())
    }

    async fn run(
        &self,
        request: &BookingRequest,
        moving: Option<&str>,
    ) -> Result<BookingOutcome, BookingRejection> {
        let deadline = self.deadline();

        debug!(phase = %BookingPhase::Validating, "Entering phase");
        validate_request(request)?;
        let prepared = self
            .prepare(
                &request.tenant_id,
                request.agent_id.as_deref(),
                &request.start,
                &request.end,
                deadline,
            )
            .await?;

        debug!(phase = %BookingPhase::CheckingAvailability, window = %prepared.window, "Entering phase");
        let verdict = self.resolve(&prepared, moving, deadline).await?;
        if let Some(rejection) = BookingRejection::from_verdict(verdict) {
            return Err(rejection);
        }

        debug!(phase = %BookingPhase::Creating, "Entering phase");
        let draft = EventDraft {
            window: prepared.window,
            attendee: request.attendee.clone(),
            metadata: request.metadata.clone(),
        };
        let calendar = &prepared.profile.calendar;
        let written = match moving {
            Some(event_id) => {
                bounded(
                    deadline,
                    prepared.provider.update_event(calendar, event_id, &draft),
                )
                .await
            }
            None => bounded(deadline, prepared.provider.create_event(calendar, &draft)).await,
        };

        match written {
            Ok(created) => {
                info!(
                    calendar = %calendar,
                    event_id = %created.event_id,
                    window = %created.canonical_window,
                    "Booking confirmed"
                );
                Ok(BookingOutcome::Confirmed {
                    event_id: created.event_id,
                    window: created.canonical_window,
                })
            }
            Err(e) => {
                warn!(calendar = %calendar, provider = prepared.provider.name(), error = %e, "Calendar write failed");
                Err(e.into())
            }
        }
    }

    /// The `Validating` phase minus request-shape checks: directory lookups,
    /// normalization in the agent's timezone and backend selection.
    async fn prepare(
        &self,
        tenant_id: &str,
        agent_id: Option<&str>,
        start: &str,
        end: &str,
        deadline: Deadline,
    ) -> Result<Prepared, BookingRejection> {
        if tenant_id.trim().is_empty() {
            return Err(BookingRejection::invalid_input("tenant id is required"));
        }
        if start.trim().is_empty() || end.trim().is_empty() {
            return Err(BookingRejection::invalid_input("start and end are required"));
        }

        let (profile, lead_minutes) = bounded(deadline, async {
            let profile = self.directory.resolve_agent(tenant_id, agent_id).await;
            let lead = self.directory.minimum_lead_minutes(tenant_id).await;
            Ok((profile, lead))
        })
        .await?;
        let profile = profile?;
        let lead_minutes = lead_minutes?;

        let window = normalize_window(start, end, profile.timezone)?;
        let provider = self.providers.resolve(&profile.calendar)?;
        let params = self.params.clone().with_min_lead_minutes(lead_minutes);
        params.validate()?;

        Ok(Prepared {
            profile,
            provider,
            window,
            params,
            now: self.clock.now(),
        })
    }

    /// The `CheckingAvailability` phase: one busy-interval snapshot, one search.
    async fn resolve(
        &self,
        prepared: &Prepared,
        moving: Option<&str>,
        deadline: Deadline,
    ) -> Result<AvailabilityVerdict, BookingRejection> {
        let hint = busy_window_hint(&prepared.window, prepared.now, &prepared.params)?;
        let calendar = &prepared.profile.calendar;

        let busy = bounded(
            deadline,
            prepared.provider.fetch_busy_intervals(calendar, &hint),
        )
        .await
        .map_err(|e| {
            warn!(calendar = %calendar, provider = prepared.provider.name(), error = %e, "Busy interval fetch failed");
            BookingRejection::from(e)
        })?;
        let busy = match moving {
            Some(event_id) => excluding_event(busy, event_id),
            None => busy,
        };

        let verdict = find_slots(
            &prepared.window,
            &prepared.profile.hours,
            prepared.profile.timezone,
            &busy,
            prepared.now,
            &prepared.params,
        )?;
        Ok(verdict)
    }

    fn deadline(&self) -> Deadline {
        Deadline::now() + self.request_timeout
    }
}

fn validate_request(request: &BookingRequest) -> Result<(), BookingRejection> {
    if request.attendee.name.trim().is_empty() {
        return Err(BookingRejection::invalid_input("attendee name is required"));
    }
    if !request.attendee.has_contact() {
        return Err(BookingRejection::invalid_input(
            "attendee email or phone is required",
        ));
    }
    Ok(())
}

/// Span of calendar the search can look at: from whichever comes first of
/// the request and "now", to the end of the scan horizon.
fn busy_window_hint(
    requested: &TimeWindow,
    now: Instant,
    params: &SearchParams,
) -> Result<TimeWindow, BookingRejection> {
    let out_of_range = || {
        BookingRejection::from(ConfigError::InvalidValue {
            key: "search.horizon".to_string(),
            reason: format!("search from {} runs past the supported date range", now),
        })
    };
    let start = requested.start().min(now);
    let scan_from = now
        .checked_add_signed(params.min_lead)
        .ok_or_else(out_of_range)?
        .max(requested.start());
    let scan_end = scan_from
        .checked_add_signed(params.horizon + params.step + requested.duration())
        .ok_or_else(out_of_range)?;
    Ok(TimeWindow::new(start, requested.end().max(scan_end))?)
}

/// Run `call` under the request deadline.
async fn bounded<T, F>(deadline: Deadline, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout_at(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout),
    }
}
