//! Shared test helpers for entitlement tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use ed25519_dalek::SigningKey;
use ploston_entitlements::PluginRegistry;
use ploston_license::{LicenseInfo, LicensePayload, LicenseToken};
use std::collections::BTreeSet;

/// Fixed verification time.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
}

/// Builds a verified license granting `features`, expiring end of 2030.
pub fn license_with(features: &[&str]) -> LicenseInfo {
    let signing_key = SigningKey::from_bytes(&[42u8; 32]);
    let payload = LicensePayload {
        lid: "lic-ent-7".to_string(),
        customer: Some("Acme Corp".to_string()),
        exp: Some(Utc.with_ymd_and_hms(2030, 12, 31, 23, 59, 59).unwrap().timestamp()),
        seats: 10,
        features: features.iter().map(|f| f.to_string()).collect(),
    };
    let token = LicenseToken::sign(&signing_key, &payload).unwrap();
    LicenseToken::verify_with_key(&token, &signing_key.verifying_key().to_bytes())
        .unwrap()
        .bind("instance-abc", now())
        .unwrap()
}

/// Registry reporting a fixed running set.
pub struct FixedRegistry(pub BTreeSet<String>);

impl FixedRegistry {
    pub fn of(names: &[&str]) -> Self {
        Self(names.iter().map(|n| n.to_string()).collect())
    }
}

impl PluginRegistry for FixedRegistry {
    fn running_plugins(&self) -> BTreeSet<String> {
        self.0.clone()
    }
}
