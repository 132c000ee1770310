//! Licensing for Ploston Enterprise.
//!
//! This module handles:
//! - Offline license files verified via Ed25519 signatures
//! - Online key exchange with the license server, with bounded retry
//! - Stable per-installation identity for license binding
//! - Caching the verified license for the process lifetime
//!
//! # Design Principles
//!
//! - **Verify once at startup**: validation blocks before the host serves work
//! - **Offline is authoritative**: a license file wins over a key and never
//!   falls back to the network
//! - **Reject, don't flag**: an expired license fails verification instead of
//!   producing a `LicenseInfo` callers must remember to re-check
//!
//! # Token Format
//!
//! Tokens are formatted as: `base64url(header).base64url(payload).base64url(signature)`
//! The payload is a JSON object signed with Ed25519, containing:
//! - License ID, customer, expiry, seat count, and feature tokens

mod cache;
mod config;
mod error;
mod identity;
mod info;
mod online;
mod token;
mod verifier;

pub use cache::{LicenseCache, LicenseManager};
pub use config::{
    LicenseConfig, LicenseCredential, LicenseMode, RetryPolicy, DEFAULT_LICENSE_SERVER,
    ENV_HOME, ENV_LICENSE_FILE, ENV_LICENSE_KEY, ENV_LICENSE_MODE, ENV_LICENSE_SERVER,
};
pub use error::{LicenseError, LicenseResult};
pub use identity::{default_config_dir, DeviceInfo, InstanceId, InstanceIdentity, INSTANCE_ID_FILE};
pub use info::{perpetual_expiry, LicenseInfo, PERPETUAL_EXPIRY_SECS};
pub use online::{exchange_with_retry, LicenseServer, RejectionResponse, TokenResponse, ValidationRequest};
pub use token::{LicensePayload, LicenseToken, VerifiedToken, LICENSE_PUBLIC_KEY};
pub use verifier::LicenseVerifier;

#[cfg(feature = "online")]
pub use online::HttpLicenseServer;
