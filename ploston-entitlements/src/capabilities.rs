//! Capabilities snapshot exposed to discovery endpoints.
//!
//! Built fresh on every query: the running plugin set can change
//! independently of the license, so nothing here is cached.

use crate::flags::FeatureFlags;
use crate::plugin::PluginRegistry;
use crate::state::EntitlementState;
use chrono::SecondsFormat;
use ploston_license::LicenseInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Tier tag reported by this distribution.
pub const ENTERPRISE_TIER: &str = "enterprise";

/// Feature switches plus the live plugin set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFeatures {
    pub workflows: bool,
    pub mcp: bool,
    pub rest_api: bool,
    pub policy: bool,
    pub patterns: bool,
    pub synthesis: bool,
    pub parallel_execution: bool,
    pub compensation_steps: bool,
    pub human_approval: bool,
    /// Plugins currently running, as reported by the registry.
    pub plugins: BTreeSet<String>,
}

/// Numeric limits; `None` is unbounded and serializes as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityLimits {
    pub max_concurrent_executions: Option<u32>,
    pub max_workflows: Option<u32>,
    pub telemetry_retention_days: u32,
}

/// License metadata safe to expose to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityLicense {
    pub id: String,
    /// ISO-8601 expiry.
    pub expires: String,
    pub seats: u32,
    pub features: BTreeSet<String>,
}

impl From<&LicenseInfo> for CapabilityLicense {
    fn from(info: &LicenseInfo) -> Self {
        Self {
            id: info.id().to_string(),
            expires: info.expires_at().to_rfc3339_opts(SecondsFormat::Secs, true),
            seats: info.seats(),
            features: info.features().clone(),
        }
    }
}

/// What this deployment can do right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitiesSnapshot {
    pub tier: String,
    pub version: String,
    pub features: CapabilityFeatures,
    pub limits: CapabilityLimits,
    /// `None` unless a license was actually validated.
    pub license: Option<CapabilityLicense>,
}

/// Combines flags, running plugins and license metadata. Pure.
#[must_use]
pub fn snapshot(
    flags: &FeatureFlags,
    running_plugins: BTreeSet<String>,
    license: Option<&LicenseInfo>,
    version: &str,
) -> CapabilitiesSnapshot {
    CapabilitiesSnapshot {
        tier: ENTERPRISE_TIER.to_string(),
        version: version.to_string(),
        features: CapabilityFeatures {
            workflows: flags.workflows,
            mcp: flags.mcp,
            rest_api: flags.rest_api,
            policy: flags.policy,
            patterns: flags.patterns,
            synthesis: flags.synthesis,
            parallel_execution: flags.parallel_execution,
            compensation_steps: flags.compensation_steps,
            human_approval: flags.human_approval,
            plugins: running_plugins,
        },
        limits: CapabilityLimits {
            max_concurrent_executions: flags.max_concurrent_executions,
            max_workflows: flags.max_workflows,
            telemetry_retention_days: flags.telemetry_retention_days,
        },
        license: license.map(CapabilityLicense::from),
    }
}

/// Pull-based accessor consumed by the host's introspection endpoints.
pub trait CapabilitiesProvider: Send + Sync {
    fn get_capabilities(&self) -> CapabilitiesSnapshot;
}

/// Capabilities backed by the shared entitlement state and plugin registry.
pub struct EnterpriseCapabilities {
    state: Arc<EntitlementState>,
    registry: Arc<dyn PluginRegistry>,
    version: String,
}

impl EnterpriseCapabilities {
    #[must_use]
    pub fn new(
        state: Arc<EntitlementState>,
        registry: Arc<dyn PluginRegistry>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            state,
            registry,
            version: version.into(),
        }
    }
}

impl CapabilitiesProvider for EnterpriseCapabilities {
    fn get_capabilities(&self) -> CapabilitiesSnapshot {
        let current = self.state.current();
        snapshot(
            current.flags(),
            self.registry.running_plugins(),
            current.license(),
            &self.version,
        )
    }
}
