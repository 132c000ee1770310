//! Holds the most recent verification result.

use crate::config::LicenseCredential;
use crate::error::{LicenseError, LicenseResult};
use crate::info::LicenseInfo;
use crate::verifier::LicenseVerifier;
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

#[derive(Debug)]
struct CachedLicense {
    fingerprint: String,
    info: Arc<LicenseInfo>,
}

/// At most one verified license, replaced wholesale.
///
/// Readers receive a shared handle to an immutable `LicenseInfo`, so a
/// concurrent `set` never exposes a partially updated value.
#[derive(Debug, Default)]
pub struct LicenseCache {
    slot: RwLock<Option<CachedLicense>>,
}

impl LicenseCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current license, if one has been verified.
    #[must_use]
    pub fn get(&self) -> Option<Arc<LicenseInfo>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|cached| Arc::clone(&cached.info))
    }

    /// Replaces the current license.
    pub fn set(&self, info: LicenseInfo) -> Arc<LicenseInfo> {
        self.store(String::new(), info)
    }

    /// Drops the current license.
    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn store(&self, fingerprint: String, info: LicenseInfo) -> Arc<LicenseInfo> {
        let info = Arc::new(info);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(CachedLicense {
            fingerprint,
            info: Arc::clone(&info),
        });
        info
    }

    fn lookup(&self, fingerprint: &str, now: DateTime<Utc>) -> Option<Arc<LicenseInfo>> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref()
            .filter(|cached| cached.fingerprint == fingerprint && !cached.info.is_expired_at(now))
            .map(|cached| Arc::clone(&cached.info))
    }
}

/// Verifier fronted by a cache, so repeated validation of one credential is cheap.
pub struct LicenseManager {
    verifier: LicenseVerifier,
    cache: LicenseCache,
}

impl LicenseManager {
    /// Wraps a verifier with an empty cache.
    #[must_use]
    pub fn new(verifier: LicenseVerifier) -> Self {
        Self {
            verifier,
            cache: LicenseCache::new(),
        }
    }

    /// Returns the underlying cache.
    #[must_use]
    pub fn cache(&self) -> &LicenseCache {
        &self.cache
    }

    /// Returns the current license, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<LicenseInfo>> {
        self.cache.get()
    }

    /// Validates `credential`, reusing the cached result when it was produced
    /// by the same credential and has not expired.
    pub fn validate(&self, credential: Option<&LicenseCredential>) -> LicenseResult<Arc<LicenseInfo>> {
        self.validate_at(credential, Utc::now())
    }

    /// Like [`LicenseManager::validate`], with an explicit verification time.
    pub fn validate_at(
        &self,
        credential: Option<&LicenseCredential>,
        now: DateTime<Utc>,
    ) -> LicenseResult<Arc<LicenseInfo>> {
        let cred = credential.ok_or(LicenseError::NoLicense)?;
        let fingerprint = cred.fingerprint();
        if let Some(hit) = self.cache.lookup(&fingerprint, now) {
            debug!(license_id = %hit.id(), "License served from cache");
            return Ok(hit);
        }
        let info = self.verifier.validate_at(Some(cred), now)?;
        Ok(self.cache.store(fingerprint, info))
    }

    /// Forces a fresh verification and replaces the cached license on success.
    pub fn revalidate(&self, credential: Option<&LicenseCredential>) -> LicenseResult<Arc<LicenseInfo>> {
        let info = self.verifier.validate(credential)?;
        let fingerprint = credential.map(LicenseCredential::fingerprint).unwrap_or_default();
        Ok(self.cache.store(fingerprint, info))
    }
}
