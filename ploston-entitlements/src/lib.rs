//! Entitlement engine for Ploston Enterprise.
//!
//! Turns a verified license into:
//! - [`FeatureFlags`]: the runtime switches and limits the host consults
//! - a gated [`PluginHost`] holding only the plugins the license pays for
//! - a [`CapabilitiesSnapshot`] for discovery endpoints
//!
//! All of it hangs off one [`EntitlementState`] created at startup and passed
//! by reference, so tests construct isolated state instead of sharing globals.

mod capabilities;
mod error;
mod flags;
mod plugin;
mod state;

pub use capabilities::{
    snapshot, CapabilitiesProvider, CapabilitiesSnapshot, CapabilityFeatures, CapabilityLicense,
    CapabilityLimits, EnterpriseCapabilities, ENTERPRISE_TIER,
};
pub use error::{PluginError, PluginResult};
pub use flags::{
    derive, FeatureFlags, PremiumFeature, ENTERPRISE_MAX_CONCURRENT_EXECUTIONS,
    ENTERPRISE_TELEMETRY_RETENTION_DAYS, INFRASTRUCTURE_PLUGINS,
};
pub use plugin::{PatternsPlugin, Plugin, PluginHost, PluginRegistry, PolicyPlugin, SynthesisPlugin};
pub use state::{EntitlementState, Entitlements};
