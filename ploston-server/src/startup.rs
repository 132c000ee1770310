//! License gate run before the server accepts work.

use std::sync::Arc;
use ploston_entitlements::{
    CapabilitiesProvider, EnterpriseCapabilities, EntitlementState, PluginHost,
};
use ploston_license::{
    LicenseConfig, LicenseError, LicenseManager, LicenseMode, LicenseResult, LicenseVerifier,
};
use tracing::{info, warn};

/// Licenses expiring within this many days trigger a startup warning.
pub const EXPIRY_WARNING_DAYS: i64 = 30;

/// Everything startup produces for the host.
pub struct Bootstrap {
    state: Arc<EntitlementState>,
    plugins: Arc<PluginHost>,
    manager: Option<LicenseManager>,
}

impl Bootstrap {
    fn new(state: EntitlementState, manager: Option<LicenseManager>) -> Self {
        let plugins = PluginHost::assemble(&state.flags());
        Self {
            state: Arc::new(state),
            plugins: Arc::new(plugins),
            manager,
        }
    }

    /// Shared entitlement state.
    pub fn state(&self) -> &Arc<EntitlementState> {
        &self.state
    }

    /// Gated plugins entitled by the license.
    pub fn plugins(&self) -> &Arc<PluginHost> {
        &self.plugins
    }

    /// The license manager, absent in ungated deployments.
    pub fn manager(&self) -> Option<&LicenseManager> {
        self.manager.as_ref()
    }

    /// Capabilities provider over this startup's state and plugins.
    pub fn capabilities(&self, version: &str) -> Arc<dyn CapabilitiesProvider> {
        Arc::new(EnterpriseCapabilities::new(
            Arc::clone(&self.state),
            self.plugins.clone(),
            version,
        ))
    }
}

/// Runs the license gate described by `config`. Blocks on network validation.
pub fn bootstrap(config: &LicenseConfig) -> LicenseResult<Bootstrap> {
    match config.mode {
        LicenseMode::Disabled => {
            info!("License gating disabled, enabling all capabilities");
            Ok(Bootstrap::new(EntitlementState::licenseless(), None))
        }
        LicenseMode::Required => bootstrap_with(config, LicenseVerifier::from_config(config)?),
    }
}

/// Runs the license gate with an explicit verifier.
pub fn bootstrap_with(config: &LicenseConfig, verifier: LicenseVerifier) -> LicenseResult<Bootstrap> {
    let manager = LicenseManager::new(verifier);
    let info = manager.validate(config.credential().as_ref())?;

    let days_left = info.days_until_expiry();
    if !info.is_perpetual() && days_left < EXPIRY_WARNING_DAYS {
        warn!(license_id = %info.id(), days_left, "License expires soon");
    }

    Ok(Bootstrap::new(EntitlementState::licensed(info), Some(manager)))
}

/// Actionable message printed when the license gate fails.
pub fn failure_message(err: &LicenseError) -> String {
    let mut msg = format!("[Ploston Enterprise] Error: {err} ({})\n\n", err.code());
    if err.is_retryable() {
        msg.push_str("The license server could not be reached. Check network access to the\n");
        msg.push_str("license server, or use an offline license file via PLOSTON_LICENSE_FILE.\n\n");
    }
    msg.push_str("Options:\n");
    msg.push_str("  1. Renew license: Contact sales@ostanlabs.com\n");
    msg.push_str("  2. Downgrade to OSS: pip install ploston (replaces enterprise)\n\n");
    msg.push_str("Your workflows and data are preserved. OSS supports all core features.\n");
    msg
}
