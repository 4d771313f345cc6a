//! Engine configuration.
//!
//! Search tunables, the booking deadline, directory caching, logging and the
//! tenant table, loaded from a single JSON file.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::availability::{
    parse_local_time, parse_timezone, parse_weekday, DayHours, SearchParams, WeeklyOfficeHours,
};
use crate::directory::AgentProfile;
use crate::error::ConfigError;
use crate::providers::{CalendarRef, ProviderKind};

/// Longest accepted directory cache TTL (30 days).
pub const MAX_CACHE_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Booking engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Slot search tunables
    #[serde(default)]
    pub search: SearchConfig,

    /// Orchestrator settings
    #[serde(default)]
    pub booking: BookingConfig,

    /// Directory cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Tenants and their agents
    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
}

/// Slot search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Minutes between consecutive candidate starts
    #[serde(default = "default_step_minutes")]
    pub step_minutes: u32,

    /// Days past the first candidate the scan may go
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,

    /// Maximum alternatives returned with a rejection
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
}

/// Booking orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Deadline covering every provider call of one request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Lead time for tenants that do not set their own
    #[serde(default = "default_min_lead_minutes")]
    pub default_min_lead_minutes: u32,
}

/// Directory cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON logging format
    #[serde(default)]
    pub json_format: bool,
}

/// One tenant (client business).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub id: String,

    #[serde(default)]
    pub min_lead_minutes: Option<u32>,

    /// Agent used when a request names none
    #[serde(default)]
    pub default_agent: Option<String>,

    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

/// One bookable agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,

    /// IANA timezone name
    pub timezone: String,

    pub calendar: CalendarRef,

    /// Weekday name to hours; all seven days must be present
    #[serde(default)]
    pub office_hours: BTreeMap<String, DayHoursConfig>,
}

/// Office hours for one weekday as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayHoursConfig {
    #[serde(default)]
    pub start: String,

    #[serde(default)]
    pub end: String,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl DayHoursConfig {
    pub fn open(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
            enabled: true,
        }
    }

    pub fn closed() -> Self {
        Self {
            start: String::new(),
            end: String::new(),
            enabled: false,
        }
    }
}

fn default_step_minutes() -> u32 {
    15
}

fn default_horizon_days() -> u32 {
    7
}

fn default_max_suggestions() -> usize {
    3
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_min_lead_minutes() -> u32 {
    crate::directory::DEFAULT_MIN_LEAD_MINUTES
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            step_minutes: default_step_minutes(),
            horizon_days: default_horizon_days(),
            max_suggestions: default_max_suggestions(),
        }
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            default_min_lead_minutes: default_min_lead_minutes(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_cache_ttl(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AgentConfig {
    /// Parse the timezone and office-hours table into an [`AgentProfile`].
    ///
    /// # Errors
    ///
    /// Unknown timezone or weekday, unparseable times, a missing weekday, or
    /// an enabled day whose start is not before its end.
    pub fn to_profile(&self) -> Result<AgentProfile, ConfigError> {
        let timezone = parse_timezone(&self.timezone)?;

        let mut hours = WeeklyOfficeHours::new();
        let mut seen = HashMap::new();
        for (name, day) in &self.office_hours {
            let weekday = parse_weekday(name)?;
            if let Some(previous) = seen.insert(weekday, name) {
                return Err(ConfigError::InvalidValue {
                    key: format!("agents.{}.office_hours.{}", self.id, name),
                    reason: format!("Same weekday as '{}'", previous),
                });
            }
            let parsed = if day.enabled {
                let prefix = format!("agents.{}.office_hours.{}", self.id, name);
                DayHours::open(
                    parse_local_time(&format!("{}.start", prefix), &day.start)?,
                    parse_local_time(&format!("{}.end", prefix), &day.end)?,
                )
            } else {
                DayHours::closed()
            };
            hours.set(weekday, parsed);
        }
        hours.validate()?;

        Ok(AgentProfile {
            agent_id: self.id.clone(),
            calendar: self.calendar.clone(),
            hours,
            timezone,
        })
    }
}

impl EngineConfig {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validate the configuration, including every agent's office hours.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.booking.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "booking.request_timeout_ms".to_string(),
                reason: "Request timeout must be positive".to_string(),
            });
        }

        if self.cache.enabled && self.cache.ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "cache.ttl_seconds".to_string(),
                reason: "TTL must be positive when caching is enabled".to_string(),
            });
        }

        if self.cache.ttl_seconds > MAX_CACHE_TTL_SECONDS {
            return Err(ConfigError::InvalidValue {
                key: "cache.ttl_seconds".to_string(),
                reason: format!("TTL must be at most {} seconds", MAX_CACHE_TTL_SECONDS),
            });
        }

        self.search_params().validate()?;

        let mut seen = HashSet::new();
        for tenant in &self.tenants {
            if tenant.id.trim().is_empty() {
                return Err(ConfigError::MissingRequired("tenants[].id".to_string()));
            }
            if !seen.insert(tenant.id.as_str()) {
                return Err(ConfigError::InvalidValue {
                    key: format!("tenants.{}", tenant.id),
                    reason: "Duplicate tenant id".to_string(),
                });
            }

            if let Some(minutes) = tenant.min_lead_minutes {
                self.search_params()
                    .with_min_lead_minutes(minutes)
                    .validate()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: format!("tenants.{}.min_lead_minutes", tenant.id),
                        reason: "Lead time must be at most 366 days".to_string(),
                    })?;
            }

            for agent in &tenant.agents {
                agent.to_profile()?;
            }

            if let Some(default_agent) = &tenant.default_agent {
                if !tenant.agents.iter().any(|a| &a.id == default_agent) {
                    return Err(ConfigError::InvalidValue {
                        key: format!("tenants.{}.default_agent", tenant.id),
                        reason: format!("No agent named '{}'", default_agent),
                    });
                }
            }
        }

        Ok(())
    }

    /// Search parameters with the default lead time; the orchestrator
    /// replaces it with the tenant's own.
    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            min_lead: chrono::Duration::minutes(i64::from(self.booking.default_min_lead_minutes)),
            step: chrono::Duration::minutes(i64::from(self.search.step_minutes)),
            horizon: chrono::Duration::days(i64::from(self.search.horizon_days)),
            max_suggestions: self.search.max_suggestions,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.booking.request_timeout_ms)
    }

    /// Directory cache TTL, saturating at the largest representable duration.
    pub fn cache_ttl(&self) -> chrono::Duration {
        i64::try_from(self.cache.ttl_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// A single-tenant configuration: one agent in Melbourne working
    /// Monday to Friday, 09:00 to 17:00, on the Graph backend.
    pub fn for_testing() -> Self {
        let mut office_hours = BTreeMap::new();
        for day in ["monday", "tuesday", "wednesday", "thursday", "friday"] {
            office_hours.insert(day.to_string(), DayHoursConfig::open("09:00", "17:00"));
        }
        for day in ["saturday", "sunday"] {
            office_hours.insert(day.to_string(), DayHoursConfig::closed());
        }

        Self {
            tenants: vec![TenantConfig {
                id: "acme".to_string(),
                min_lead_minutes: None,
                default_agent: Some("alex".to_string()),
                agents: vec![AgentConfig {
                    id: "alex".to_string(),
                    timezone: "Australia/Melbourne".to_string(),
                    calendar: CalendarRef::new(ProviderKind::Graph, "alex@acme.example"),
                    office_hours,
                }],
            }],
            ..Default::default()
        }
    }
}
