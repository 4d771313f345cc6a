//! Tenant and agent directory.
//!
//! Answers "which calendar, office hours and timezone does this agent use?"
//! and "what lead time does this tenant require?". The engine depends only on
//! the [`TenantDirectory`] trait; [`StaticDirectory`] serves the values from
//! configuration and [`CachedDirectory`] puts a TTL cache in front of any
//! other implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use chrono_tz::Tz;
use tracing::debug;

pub mod cache;

pub use cache::TtlCache;

use crate::availability::WeeklyOfficeHours;
use crate::booking::config::EngineConfig;
use crate::clock::Clock;
use crate::error::{ConfigError, DirectoryError};
use crate::providers::CalendarRef;

/// Lead time applied when a tenant does not configure one.
pub const DEFAULT_MIN_LEAD_MINUTES: u32 = 15;

/// Everything the engine needs to know about one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    pub agent_id: String,
    pub calendar: CalendarRef,
    pub hours: WeeklyOfficeHours,
    pub timezone: Tz,
}

/// Lookup of per-tenant and per-agent scheduling settings.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Resolve an agent; `None` selects the tenant's default agent.
    async fn resolve_agent(
        &self,
        tenant_id: &str,
        agent_id: Option<&str>,
    ) -> Result<AgentProfile, DirectoryError>;

    /// Minimum minutes between "now" and a bookable start for this tenant.
    async fn minimum_lead_minutes(&self, tenant_id: &str) -> Result<u32, DirectoryError>;
}

/// Settings for one tenant.
#[derive(Debug, Clone, Default)]
pub struct TenantEntry {
    pub min_lead_minutes: Option<u32>,
    pub default_agent: Option<String>,
    pub agents: HashMap<String, AgentProfile>,
}

impl TenantEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent(mut self, profile: AgentProfile) -> Self {
        self.agents.insert(profile.agent_id.clone(), profile);
        self
    }

    pub fn with_default_agent(mut self, agent_id: &str) -> Self {
        self.default_agent = Some(agent_id.to_string());
        self
    }

    pub fn with_min_lead_minutes(mut self, minutes: u32) -> Self {
        self.min_lead_minutes = Some(minutes);
        self
    }
}

/// Directory backed by a fixed set of tenants.
#[derive(Debug, Clone)]
pub struct StaticDirectory {
    tenants: HashMap<String, TenantEntry>,
    default_min_lead_minutes: u32,
}

impl Default for StaticDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self {
            tenants: HashMap::new(),
            default_min_lead_minutes: DEFAULT_MIN_LEAD_MINUTES,
        }
    }

    pub fn with_default_min_lead_minutes(mut self, minutes: u32) -> Self {
        self.default_min_lead_minutes = minutes;
        self
    }

    pub fn with_tenant(mut self, tenant_id: &str, entry: TenantEntry) -> Self {
        self.tenants.insert(tenant_id.to_string(), entry);
        self
    }

    /// Build from the `tenants` section of the engine configuration.
    ///
    /// # Errors
    ///
    /// Any timezone, weekday or office-hours problem in an agent entry.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let mut directory =
            Self::new().with_default_min_lead_minutes(config.booking.default_min_lead_minutes);
        for tenant in &config.tenants {
            let mut entry = TenantEntry {
                min_lead_minutes: tenant.min_lead_minutes,
                default_agent: tenant.default_agent.clone(),
                agents: HashMap::new(),
            };
            for agent in &tenant.agents {
                entry = entry.with_agent(agent.to_profile()?);
            }
            directory = directory.with_tenant(&tenant.id, entry);
        }
        Ok(directory)
    }

    fn tenant(&self, tenant_id: &str) -> Result<&TenantEntry, DirectoryError> {
        self.tenants
            .get(tenant_id)
            .ok_or_else(|| DirectoryError::TenantNotFound(tenant_id.to_string()))
    }
}

#[async_trait]
impl TenantDirectory for StaticDirectory {
    async fn resolve_agent(
        &self,
        tenant_id: &str,
        agent_id: Option<&str>,
    ) -> Result<AgentProfile, DirectoryError> {
        let tenant = self.tenant(tenant_id)?;

        let agent_id = match agent_id.or(tenant.default_agent.as_deref()) {
            Some(id) => id.to_string(),
            // A tenant with a single agent needs no explicit default.
            None if tenant.agents.len() == 1 => tenant
                .agents
                .keys()
                .next()
                .cloned()
                .ok_or_else(|| DirectoryError::NoDefaultAgent(tenant_id.to_string()))?,
            None => return Err(DirectoryError::NoDefaultAgent(tenant_id.to_string())),
        };

        tenant
            .agents
            .get(&agent_id)
            .cloned()
            .ok_or_else(|| DirectoryError::AgentNotFound {
                tenant: tenant_id.to_string(),
                agent: agent_id,
            })
    }

    async fn minimum_lead_minutes(&self, tenant_id: &str) -> Result<u32, DirectoryError> {
        let tenant = self.tenant(tenant_id)?;
        Ok(tenant
            .min_lead_minutes
            .unwrap_or(self.default_min_lead_minutes))
    }
}

type AgentKey = (String, Option<String>);

/// [`TenantDirectory`] decorator that caches successful lookups.
pub struct CachedDirectory<D> {
    inner: D,
    agents: TtlCache<AgentKey, AgentProfile>,
    leads: TtlCache<String, u32>,
}

impl<D: TenantDirectory> CachedDirectory<D> {
    pub fn new(inner: D, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            agents: TtlCache::new(ttl, clock.clone()),
            leads: TtlCache::new(ttl, clock),
        }
    }

    /// Forget everything cached for one tenant.
    pub async fn invalidate_tenant(&self, tenant_id: &str) {
        let agents = self
            .agents
            .invalidate_where(|(tenant, _)| tenant == tenant_id)
            .await;
        self.leads.invalidate(&tenant_id.to_string()).await;
        debug!(tenant_id, agents, "Invalidated cached directory entries");
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

#[async_trait]
impl<D: TenantDirectory> TenantDirectory for CachedDirectory<D> {
    async fn resolve_agent(
        &self,
        tenant_id: &str,
        agent_id: Option<&str>,
    ) -> Result<AgentProfile, DirectoryError> {
        let key = (tenant_id.to_string(), agent_id.map(str::to_string));
        if let Some(profile) = self.agents.get(&key).await {
            return Ok(profile);
        }
        let profile = self.inner.resolve_agent(tenant_id, agent_id).await?;
        self.agents.set(key, profile.clone()).await;
        Ok(profile)
    }

    async fn minimum_lead_minutes(&self, tenant_id: &str) -> Result<u32, DirectoryError> {
        let key = tenant_id.to_string();
        if let Some(minutes) = self.leads.get(&key).await {
            return Ok(minutes);
        }
        let minutes = self.inner.minimum_lead_minutes(tenant_id).await?;
        self.leads.set(key, minutes).await;
        Ok(minutes)
    }
}
