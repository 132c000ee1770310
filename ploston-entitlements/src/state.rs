//! The process's entitlement state: active license plus derived flags.
//!
//! Created once at startup and shared by reference with everything that
//! reads flags or capabilities. The pair is published as one value, so
//! readers never observe flags from one license next to metadata from another.

use crate::flags::FeatureFlags;
use ploston_license::LicenseInfo;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// One consistent view of the active license and the flags derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entitlements {
    license: Option<Arc<LicenseInfo>>,
    flags: FeatureFlags,
}

impl Entitlements {
    /// The validated license; `None` in ungated deployments.
    #[must_use]
    pub fn license(&self) -> Option<&LicenseInfo> {
        self.license.as_deref()
    }

    /// The active feature flags.
    #[must_use]
    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }
}

/// Single-writer, many-reader holder of the current [`Entitlements`].
#[derive(Debug)]
pub struct EntitlementState {
    current: RwLock<Arc<Entitlements>>,
}

impl EntitlementState {
    /// State backed by a verified license.
    #[must_use]
    pub fn licensed(info: Arc<LicenseInfo>) -> Self {
        Self {
            current: RwLock::new(Arc::new(licensed_entitlements(info))),
        }
    }

    /// State for ungated deployments, using the static licenseless flags.
    #[must_use]
    pub fn licenseless() -> Self {
        Self {
            current: RwLock::new(Arc::new(Entitlements {
                license: None,
                flags: FeatureFlags::licenseless(),
            })),
        }
    }

    /// Returns the current entitlements.
    #[must_use]
    pub fn current(&self) -> Arc<Entitlements> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Convenience accessor for the current flags.
    #[must_use]
    pub fn flags(&self) -> FeatureFlags {
        self.current().flags.clone()
    }

    /// Convenience accessor for the current license.
    #[must_use]
    pub fn license(&self) -> Option<Arc<LicenseInfo>> {
        self.current().license.clone()
    }

    /// Re-derives flags for a newly verified license and swaps both in.
    pub fn publish(&self, info: Arc<LicenseInfo>) -> Arc<Entitlements> {
        let next = Arc::new(licensed_entitlements(info));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        info!(
            license_id = next.license().map(LicenseInfo::id).unwrap_or_default(),
            plugins = ?next.flags.enabled_plugins,
            "Published entitlements"
        );
        next
    }
}

fn licensed_entitlements(info: Arc<LicenseInfo>) -> Entitlements {
    let flags = FeatureFlags::derive(&info);
    Entitlements {
        license: Some(info),
        flags,
    }
}
