//! Licensing configuration and credential selection.

use crate::identity::default_config_dir;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the online license key.
pub const ENV_LICENSE_KEY: &str = "PLOSTON_LICENSE_KEY";
/// Environment variable holding the offline license file path.
pub const ENV_LICENSE_FILE: &str = "PLOSTON_LICENSE_FILE";
/// Environment variable overriding the license server base URL.
pub const ENV_LICENSE_SERVER: &str = "PLOSTON_LICENSE_SERVER";
/// Environment variable overriding the per-user config directory.
pub const ENV_HOME: &str = "PLOSTON_HOME";
/// Environment variable selecting `required` or `disabled` license gating.
pub const ENV_LICENSE_MODE: &str = "PLOSTON_LICENSE_MODE";

/// Production license server.
pub const DEFAULT_LICENSE_SERVER: &str = "https://licensing.ostanlabs.com";

/// A license credential to verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseCredential {
    /// Online license key.
    Key(String),
    /// Offline signed license file.
    File(PathBuf),
}

impl LicenseCredential {
    /// Picks the credential to verify. A file wins over a key; empty values count as absent.
    #[must_use]
    pub fn resolve(key: Option<String>, file: Option<PathBuf>) -> Option<Self> {
        let file = file.filter(|p| !p.as_os_str().is_empty());
        let key = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());

        match (file, key) {
            (Some(path), _) => Some(Self::File(path)),
            (None, Some(key)) => Some(Self::Key(key)),
            (None, None) => None,
        }
    }

    /// SHA-256 fingerprint of the credential, safe to log and compare.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            Self::Key(key) => {
                hasher.update(b"key:");
                hasher.update(key.as_bytes());
            }
            Self::File(path) => {
                hasher.update(b"file:");
                hasher.update(path.to_string_lossy().as_bytes());
            }
        }
        let digest = hasher.finalize();
        digest[..8].iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Whether this deployment gates capabilities on a license.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LicenseMode {
    /// A verified license is required to start.
    #[default]
    Required,
    /// Ungated deployment; the static licenseless flags apply.
    Disabled,
}

impl LicenseMode {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" | "none" => Self::Disabled,
            _ => Self::Required,
        }
    }
}

/// Bounded retry schedule for online validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of requests, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled after each attempt.
    pub initial_backoff: Duration,
    /// Upper bound for a single backoff delay.
    pub max_backoff: Duration,
    /// Overall time budget across all attempts.
    pub total_budget: Duration,
    /// Timeout for a single request.
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
            total_budget: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff to wait after the given (1-based) failed attempt.
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// All inputs the licensing pipeline reads at startup.
#[derive(Debug, Clone)]
pub struct LicenseConfig {
    /// Online license key.
    pub key: Option<String>,
    /// Offline license file path.
    pub file: Option<PathBuf>,
    /// License server base URL.
    pub server_url: String,
    /// Per-user config directory holding the instance identity.
    pub config_dir: PathBuf,
    /// Gating mode.
    pub mode: LicenseMode,
    /// Online retry schedule.
    pub retry: RetryPolicy,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            key: None,
            file: None,
            server_url: DEFAULT_LICENSE_SERVER.to_string(),
            config_dir: default_config_dir(),
            mode: LicenseMode::Required,
            retry: RetryPolicy::default(),
        }
    }
}

impl LicenseConfig {
    /// Loads configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            key: var(ENV_LICENSE_KEY),
            file: var(ENV_LICENSE_FILE).map(PathBuf::from),
            server_url: var(ENV_LICENSE_SERVER).unwrap_or(defaults.server_url),
            config_dir: var(ENV_HOME).map(PathBuf::from).unwrap_or(defaults.config_dir),
            mode: var(ENV_LICENSE_MODE)
                .map(|v| LicenseMode::parse(&v))
                .unwrap_or_default(),
            retry: defaults.retry,
        }
    }

    /// The credential selected by this configuration, if any.
    #[must_use]
    pub fn credential(&self) -> Option<LicenseCredential> {
        LicenseCredential::resolve(self.key.clone(), self.file.clone())
    }
}
