//! Feature flags derived from verified entitlements.
//!
//! Core capabilities are always on for a verified license. Premium
//! capabilities follow the license's feature tokens through a fixed table.
//! Numeric limits are tier policy and never read from the license payload.

use ploston_license::LicenseInfo;
use serde::{Deserialize, Serialize};

/// Maximum concurrent workflow executions for the enterprise tier.
pub const ENTERPRISE_MAX_CONCURRENT_EXECUTIONS: u32 = 100;
/// Telemetry retention for the enterprise tier.
pub const ENTERPRISE_TELEMETRY_RETENTION_DAYS: u32 = 365;
/// Plugins enabled regardless of entitlements.
pub const INFRASTRUCTURE_PLUGINS: [&str; 2] = ["logging", "metrics"];

/// A capability gated by a license feature token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PremiumFeature {
    Policy,
    Patterns,
    Synthesis,
    ParallelExecution,
    CompensationSteps,
    HumanApproval,
}

impl PremiumFeature {
    /// Every premium feature, in plugin enablement order.
    pub const ALL: [PremiumFeature; 6] = [
        Self::Policy,
        Self::Patterns,
        Self::Synthesis,
        Self::ParallelExecution,
        Self::CompensationSteps,
        Self::HumanApproval,
    ];

    /// The license feature token that grants this capability.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::Policy => "policy",
            Self::Patterns => "patterns",
            Self::Synthesis => "synthesis",
            Self::ParallelExecution => "parallel_execution",
            Self::CompensationSteps => "compensation_steps",
            Self::HumanApproval => "human_approval",
        }
    }

    /// The plugin backing this capability, if it is plugin-provided.
    #[must_use]
    pub fn plugin(self) -> Option<&'static str> {
        match self {
            Self::Policy => Some("policy"),
            Self::Patterns => Some("patterns"),
            Self::Synthesis => Some("synthesis"),
            Self::ParallelExecution | Self::CompensationSteps | Self::HumanApproval => None,
        }
    }
}

/// Runtime feature switches and limits.
///
/// Always recomputed as a whole from a license; never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub workflows: bool,
    pub mcp: bool,
    pub rest_api: bool,
    pub policy: bool,
    pub patterns: bool,
    pub synthesis: bool,
    pub parallel_execution: bool,
    pub compensation_steps: bool,
    pub human_approval: bool,
    /// `None` means unbounded.
    pub max_concurrent_executions: Option<u32>,
    /// `None` means unbounded.
    pub max_workflows: Option<u32>,
    pub telemetry_retention_days: u32,
    /// Plugins the license entitles this deployment to run.
    pub enabled_plugins: Vec<String>,
}

impl FeatureFlags {
    /// Derives the flags for a verified license. Pure and deterministic.
    #[must_use]
    pub fn derive(info: &LicenseInfo) -> Self {
        Self::from_grants(|feature| info.has_feature(feature.token()))
    }

    /// Flags for ungated deployments: every premium capability, full limits.
    #[must_use]
    pub fn licenseless() -> Self {
        Self::from_grants(|_| true)
    }

    fn from_grants(granted: impl Fn(PremiumFeature) -> bool) -> Self {
        let enabled_plugins = INFRASTRUCTURE_PLUGINS
            .iter()
            .copied()
            .chain(
                PremiumFeature::ALL
                    .into_iter()
                    .filter(|f| granted(*f))
                    .filter_map(PremiumFeature::plugin),
            )
            .map(String::from)
            .collect();

        Self {
            workflows: true,
            mcp: true,
            rest_api: true,
            policy: granted(PremiumFeature::Policy),
            patterns: granted(PremiumFeature::Patterns),
            synthesis: granted(PremiumFeature::Synthesis),
            parallel_execution: granted(PremiumFeature::ParallelExecution),
            compensation_steps: granted(PremiumFeature::CompensationSteps),
            human_approval: granted(PremiumFeature::HumanApproval),
            max_concurrent_executions: Some(ENTERPRISE_MAX_CONCURRENT_EXECUTIONS),
            max_workflows: None,
            telemetry_retention_days: ENTERPRISE_TELEMETRY_RETENTION_DAYS,
            enabled_plugins,
        }
    }

    /// Returns the flag for a premium capability.
    #[must_use]
    pub fn is_enabled(&self, feature: PremiumFeature) -> bool {
        match feature {
            PremiumFeature::Policy => self.policy,
            PremiumFeature::Patterns => self.patterns,
            PremiumFeature::Synthesis => self.synthesis,
            PremiumFeature::ParallelExecution => self.parallel_execution,
            PremiumFeature::CompensationSteps => self.compensation_steps,
            PremiumFeature::HumanApproval => self.human_approval,
        }
    }

    /// Returns true if the named plugin is entitled to run.
    #[must_use]
    pub fn plugin_enabled(&self, name: &str) -> bool {
        self.enabled_plugins.iter().any(|p| p == name)
    }
}

/// Derives flags from a verified license.
#[must_use]
pub fn derive(info: &LicenseInfo) -> FeatureFlags {
    FeatureFlags::derive(info)
}
