//! Online key exchange with the license server.
//!
//! The server answers a validation request with the same signed token used
//! for offline files, so a compromised transport cannot forge entitlements.

use crate::config::RetryPolicy;
use crate::error::{LicenseError, LicenseResult};
use crate::identity::DeviceInfo;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Body of a validation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    /// The license key being validated.
    pub key: String,
    /// Identity of the requesting installation.
    pub instance_id: String,
    /// Host details for seat accounting.
    pub device: DeviceInfo,
}

/// Successful server response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed entitlement token.
    pub token: String,
}

/// Structured rejection returned by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionResponse {
    /// Machine-readable reason code.
    pub code: String,
    /// Human-readable reason.
    #[serde(default)]
    pub reason: String,
}

/// A license server reachable by the online verifier.
pub trait LicenseServer: Send + Sync {
    /// Exchanges a license key for a signed token.
    ///
    /// Implementations report transport failures as [`LicenseError::Network`],
    /// an exceeded `timeout` as [`LicenseError::Timeout`], and explicit denials
    /// as [`LicenseError::Rejected`].
    fn exchange(&self, request: &ValidationRequest, timeout: Duration) -> LicenseResult<String>;
}

/// Calls `server` under the retry policy, returning the signed token.
///
/// Only network errors and timeouts are retried. The loop never exceeds the
/// policy's total budget; running out of it surfaces as a timeout.
pub fn exchange_with_retry(
    server: &dyn LicenseServer,
    request: &ValidationRequest,
    policy: &RetryPolicy,
) -> LicenseResult<String> {
    let started = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let remaining = policy.total_budget.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Err(LicenseError::Timeout(started.elapsed()));
        }

        debug!(attempt, "Contacting license server");
        match server.exchange(request, policy.request_timeout.min(remaining)) {
            Ok(token) => return Ok(token),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.backoff_after(attempt);
                if started.elapsed() + delay >= policy.total_budget {
                    warn!(attempt, "License server unreachable and time budget exhausted: {}", e);
                    return Err(LicenseError::Timeout(started.elapsed()));
                }
                warn!(attempt, delay_ms = delay.as_millis() as u64, "License server unreachable, retrying: {}", e);
                thread::sleep(delay);
            }
            Err(e) => return Err(e),
        }
    }
}

/// HTTPS client for the production license server.
#[cfg(feature = "online")]
pub struct HttpLicenseServer {
    endpoint: String,
    client: reqwest::blocking::Client,
}

#[cfg(feature = "online")]
impl HttpLicenseServer {
    /// Creates a client for the server at `base_url`.
    pub fn new(base_url: &str) -> LicenseResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("ploston-license/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LicenseError::Network(format!("http client: {e}")))?;

        Ok(Self {
            endpoint: format!("{}/v1/licenses/validate", base_url.trim_end_matches('/')),
            client,
        })
    }
}

#[cfg(feature = "online")]
impl LicenseServer for HttpLicenseServer {
    fn exchange(&self, request: &ValidationRequest, timeout: Duration) -> LicenseResult<String> {
        let resp = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    LicenseError::Timeout(timeout)
                } else {
                    LicenseError::Network(format!("request failed: {e}"))
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            let body: TokenResponse = resp
                .json()
                .map_err(|e| LicenseError::Malformed(format!("invalid server response: {e}")))?;
            return Ok(body.token);
        }

        if status == reqwest::StatusCode::REQUEST_TIMEOUT {
            return Err(LicenseError::Timeout(timeout));
        }
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LicenseError::Network(format!("license server returned HTTP {status}")));
        }

        match resp.json::<RejectionResponse>() {
            Ok(rejection) => Err(LicenseError::Rejected {
                code: rejection.code,
                reason: rejection.reason,
            }),
            Err(_) => Err(LicenseError::Rejected {
                code: status.as_str().to_string(),
                reason: "license server rejected the key".to_string(),
            }),
        }
    }
}
