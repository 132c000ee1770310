//! Verified license information.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeSet;

/// Expiry assigned to licenses issued without one (9999-12-31T23:59:59Z).
pub const PERPETUAL_EXPIRY_SECS: i64 = 253_402_300_799;

/// Returns the far-future sentinel used for perpetual licenses.
#[must_use]
pub fn perpetual_expiry() -> DateTime<Utc> {
    Utc.timestamp_opt(PERPETUAL_EXPIRY_SECS, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A license that passed verification.
///
/// Only the verifier constructs these, and never partially: every field is
/// populated from a signed payload plus the local instance identity.
/// It cannot be deserialized:
///
/// ```compile_fail
/// let forged: ploston_license::LicenseInfo =
///     serde_json::from_str(r#"{"id":"forged","seats":0}"#).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseInfo {
    id: String,
    customer: String,
    expires_at: DateTime<Utc>,
    seats: u32,
    features: BTreeSet<String>,
    instance_id: String,
}

impl LicenseInfo {
    pub(crate) fn new(
        id: String,
        customer: String,
        expires_at: DateTime<Utc>,
        seats: u32,
        features: BTreeSet<String>,
        instance_id: String,
    ) -> Self {
        Self {
            id,
            customer,
            expires_at,
            seats,
            features,
            instance_id,
        }
    }

    /// Opaque license identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Customer name; empty when the issuer did not record one.
    #[must_use]
    pub fn customer(&self) -> &str {
        &self.customer
    }

    /// Expiry timestamp. Perpetual licenses report [`perpetual_expiry`].
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Maximum concurrent authorized users or installations.
    #[must_use]
    pub fn seats(&self) -> u32 {
        self.seats
    }

    /// Granted feature tokens.
    #[must_use]
    pub fn features(&self) -> &BTreeSet<String> {
        &self.features
    }

    /// Returns true if the license grants `feature`.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    /// Installation this license was bound to at verification time.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Returns true if the license carries the perpetual sentinel expiry.
    #[must_use]
    pub fn is_perpetual(&self) -> bool {
        self.expires_at >= perpetual_expiry()
    }

    /// Returns true if `now` is strictly past the expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Returns true if the license has expired as of the system clock.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whole days remaining until expiry, floored and clamped at zero.
    #[must_use]
    pub fn days_until_expiry_at(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_days().max(0)
    }

    /// Whole days remaining until expiry as of the system clock.
    #[must_use]
    pub fn days_until_expiry(&self) -> i64 {
        self.days_until_expiry_at(Utc::now())
    }
}
