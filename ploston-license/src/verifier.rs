//! License verification: offline signed files and online key exchange.

use crate::config::{LicenseConfig, LicenseCredential, RetryPolicy};
use crate::error::{LicenseError, LicenseResult};
use crate::identity::{DeviceInfo, InstanceIdentity};
use crate::info::LicenseInfo;
use crate::online::{exchange_with_retry, LicenseServer, ValidationRequest};
use crate::token::{LicenseToken, LICENSE_PUBLIC_KEY};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

/// Verifies license credentials and binds them to this installation.
pub struct LicenseVerifier {
    identity: InstanceIdentity,
    public_key: [u8; 32],
    server: Option<Box<dyn LicenseServer>>,
    retry: RetryPolicy,
}

impl LicenseVerifier {
    /// Creates an offline-only verifier trusting the embedded public key.
    #[must_use]
    pub fn new(identity: InstanceIdentity) -> Self {
        Self {
            identity,
            public_key: LICENSE_PUBLIC_KEY,
            server: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Creates a verifier from configuration, including the HTTPS license server.
    #[cfg(feature = "online")]
    pub fn from_config(config: &LicenseConfig) -> LicenseResult<Self> {
        let server = crate::online::HttpLicenseServer::new(&config.server_url)?;
        Ok(Self::new(InstanceIdentity::new(&config.config_dir))
            .with_server(Box::new(server))
            .with_retry_policy(config.retry.clone()))
    }

    /// Creates a verifier from configuration. Key credentials are unsupported in this build.
    #[cfg(not(feature = "online"))]
    pub fn from_config(config: &LicenseConfig) -> LicenseResult<Self> {
        Ok(Self::new(InstanceIdentity::new(&config.config_dir))
            .with_retry_policy(config.retry.clone()))
    }

    /// Replaces the trusted public key.
    #[must_use]
    pub fn with_public_key(mut self, public_key: [u8; 32]) -> Self {
        self.public_key = public_key;
        self
    }

    /// Sets the license server used for key credentials.
    #[must_use]
    pub fn with_server(mut self, server: Box<dyn LicenseServer>) -> Self {
        self.server = Some(server);
        self
    }

    /// Sets the online retry schedule.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the identity provider this verifier binds licenses to.
    #[must_use]
    pub fn identity(&self) -> &InstanceIdentity {
        &self.identity
    }

    /// Validates a credential against the system clock.
    ///
    /// # Errors
    ///
    /// Fails with [`LicenseError::NoLicense`] when `credential` is `None`;
    /// otherwise see [`LicenseVerifier::validate_at`].
    pub fn validate(&self, credential: Option<&LicenseCredential>) -> LicenseResult<LicenseInfo> {
        self.validate_at(credential, Utc::now())
    }

    /// Validates a credential, treating `now` as the verification time.
    ///
    /// File credentials are verified offline and never fall back to the
    /// network. An expired license is a rejection, not a `LicenseInfo`.
    pub fn validate_at(
        &self,
        credential: Option<&LicenseCredential>,
        now: DateTime<Utc>,
    ) -> LicenseResult<LicenseInfo> {
        let credential = credential.ok_or(LicenseError::NoLicense)?;
        debug!(credential = %credential.fingerprint(), "Validating license");

        let info = match credential {
            LicenseCredential::File(path) => self.validate_file(path, now)?,
            LicenseCredential::Key(key) => self.validate_key(key, now)?,
        };

        info!(
            license_id = %info.id(),
            expires_at = %info.expires_at().to_rfc3339(),
            seats = info.seats(),
            "License verified"
        );
        Ok(info)
    }

    fn validate_file(&self, path: &Path, now: DateTime<Utc>) -> LicenseResult<LicenseInfo> {
        let token = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LicenseError::FileNotFound(path.to_path_buf()),
            _ => LicenseError::Malformed(format!("unreadable license file {}: {e}", path.display())),
        })?;

        let instance_id = self.identity.get_or_create()?;
        LicenseToken::verify_with_key(&token, &self.public_key)?.bind(instance_id.as_str(), now)
    }

    fn validate_key(&self, key: &str, now: DateTime<Utc>) -> LicenseResult<LicenseInfo> {
        let instance_id = self.identity.get_or_create()?;
        let server = self.server.as_deref().ok_or_else(|| {
            LicenseError::Network("online validation is not available in this build".to_string())
        })?;

        let request = ValidationRequest {
            key: key.to_string(),
            instance_id: instance_id.to_string(),
            device: DeviceInfo::collect(),
        };
        let token = exchange_with_retry(server, &request, &self.retry)?;
        LicenseToken::verify_with_key(&token, &self.public_key)?.bind(instance_id.as_str(), now)
    }
}
