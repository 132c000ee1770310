//! Error types for license verification.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Licensing-specific errors.
///
/// Every variant is terminal for the current validation attempt. Startup
/// treats all of them as fatal.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Neither a key nor a file was supplied.
    #[error("no license provided; set PLOSTON_LICENSE_KEY or PLOSTON_LICENSE_FILE")]
    NoLicense,

    /// Offline license file does not exist.
    #[error("license file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Signed token cannot be parsed or its payload is structurally invalid.
    #[error("malformed license: {0}")]
    Malformed(String),

    /// Ed25519 signature verification failed.
    #[error("license signature invalid")]
    InvalidSignature,

    /// Signature verified but the license has already expired.
    #[error("license expired on {0}")]
    Expired(String),

    /// Transport failure while contacting the license server.
    #[error("network error: {0}")]
    Network(String),

    /// Online validation ran out of its time budget.
    #[error("license server timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// License server explicitly denied the key.
    #[error("license rejected ({code}): {reason}")]
    Rejected {
        /// Machine-readable reason code from the server.
        code: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Instance identity could not be read or persisted.
    #[error("instance identity could not be persisted: {0}")]
    IdentityPersistFailure(String),
}

impl LicenseError {
    /// Stable machine-readable code for this error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoLicense => "NO_LICENSE",
            Self::FileNotFound(_) => "FILE_NOT_FOUND",
            Self::Malformed(_) => "MALFORMED",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Expired(_) => "EXPIRED",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Rejected { .. } => "REJECTED",
            Self::IdentityPersistFailure(_) => "IDENTITY_PERSIST_FAILURE",
        }
    }

    /// Process exit code used when this error aborts startup.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoLicense => 2,
            Self::FileNotFound(_) => 3,
            Self::Malformed(_) => 4,
            Self::InvalidSignature => 5,
            Self::Expired(_) => 6,
            Self::Network(_) => 7,
            Self::Timeout(_) => 8,
            Self::Rejected { .. } => 9,
            Self::IdentityPersistFailure(_) => 10,
        }
    }

    /// Returns true if a later attempt could succeed without changing the credential.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

impl From<serde_json::Error> for LicenseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(format!("invalid payload JSON: {err}"))
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
