//! Shared test helpers for license tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::SigningKey;
use ploston_license::{
    InstanceIdentity, LicenseError, LicensePayload, LicenseResult, LicenseServer, LicenseToken,
    LicenseVerifier, RetryPolicy, ValidationRequest,
};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Returns a deterministic Ed25519 key pair from a fixed seed.
pub fn test_keypair() -> (SigningKey, [u8; 32]) {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    let signing_key = SigningKey::from_bytes(&seed);
    let verifying_key = signing_key.verifying_key();
    (signing_key, verifying_key.to_bytes())
}

/// A second, untrusted key pair.
pub fn other_keypair() -> (SigningKey, [u8; 32]) {
    let signing_key = SigningKey::from_bytes(&[7u8; 32]);
    let verifying_key = signing_key.verifying_key();
    (signing_key, verifying_key.to_bytes())
}

/// A payload expiring at `exp` with the given feature tokens.
pub fn payload_expiring(exp: DateTime<Utc>, features: &[&str]) -> LicensePayload {
    LicensePayload {
        lid: "lic-0001".to_string(),
        customer: Some("Acme Corp".to_string()),
        exp: Some(exp.timestamp()),
        seats: 25,
        features: features.iter().map(|f| f.to_string()).collect(),
    }
}

/// A payload valid for another year.
pub fn valid_payload(features: &[&str]) -> LicensePayload {
    payload_expiring(Utc::now() + Duration::days(365), features)
}

/// Signs a payload with the test key.
pub fn sign(payload: &LicensePayload) -> String {
    let (sk, _) = test_keypair();
    LicenseToken::sign(&sk, payload).unwrap()
}

/// Writes a signed license file into `dir`.
pub fn write_license_file(dir: &Path, payload: &LicensePayload) -> PathBuf {
    let path = dir.join("license.plt");
    std::fs::write(&path, sign(payload)).unwrap();
    path
}

/// Retry policy that never sleeps long.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: std::time::Duration::from_millis(1),
        max_backoff: std::time::Duration::from_millis(2),
        total_budget: std::time::Duration::from_secs(5),
        request_timeout: std::time::Duration::from_secs(1),
    }
}

/// Offline verifier trusting the test key, with identity stored under `config_dir`.
pub fn test_verifier(config_dir: &Path) -> LicenseVerifier {
    let (_, pk) = test_keypair();
    LicenseVerifier::new(InstanceIdentity::new(config_dir))
        .with_public_key(pk)
        .with_retry_policy(fast_retry())
}

/// One scripted server reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Token(String),
    Network,
    Timeout,
    Rejected(&'static str),
}

/// License server that replays a fixed script and records requests.
#[derive(Clone, Default)]
pub struct ScriptedServer {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<ValidationRequest>>>,
}

impl ScriptedServer {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ValidationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl LicenseServer for ScriptedServer {
    fn exchange(
        &self,
        request: &ValidationRequest,
        timeout: std::time::Duration,
    ) -> LicenseResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Token(token)) => Ok(token),
            Some(Reply::Network) | None => Err(LicenseError::Network("connection refused".into())),
            Some(Reply::Timeout) => Err(LicenseError::Timeout(timeout)),
            Some(Reply::Rejected(code)) => Err(LicenseError::Rejected {
                code: code.to_string(),
                reason: "key revoked".to_string(),
            }),
        }
    }
}
