//! Signed license token parsing and Ed25519 signature verification.
//!
//! Tokens use the format: `base64url(header).base64url(payload).base64url(signature)`
//!
//! The header is `{"alg":"EdDSA","typ":"PLT"}`. The payload is a JSON object:
//! - `lid`: license identifier
//! - `customer`: customer name (optional)
//! - `exp`: expiry timestamp in seconds since epoch (optional, absent = perpetual)
//! - `seats`: seat count (>= 1)
//! - `features`: granted feature tokens
//!
//! The signature covers `header_b64 + "." + payload_b64` as ASCII bytes.
//! Offline license files and online server responses share this format.

use crate::error::{LicenseError, LicenseResult};
use crate::info::{perpetual_expiry, LicenseInfo};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, TimeZone, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Embedded Ed25519 public key for production license verification (32 bytes).
pub const LICENSE_PUBLIC_KEY: [u8; 32] = [
    12, 134, 194, 194, 6, 7, 28, 127, 49, 110, 206, 80, 7, 99, 228, 209,
    44, 235, 146, 89, 84, 127, 21, 113, 108, 141, 205, 192, 18, 140, 44, 126,
];

const TOKEN_ALG: &str = "EdDSA";
const TOKEN_TYP: &str = "PLT";

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

/// The decoded token payload (matches the issuer's JSON structure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensePayload {
    /// License identifier.
    pub lid: String,
    /// Customer name.
    #[serde(default)]
    pub customer: Option<String>,
    /// Expiry timestamp (seconds since epoch), or None for perpetual.
    #[serde(default)]
    pub exp: Option<i64>,
    /// Seat count.
    pub seats: u32,
    /// Granted feature tokens.
    #[serde(default)]
    pub features: Vec<String>,
}

impl LicensePayload {
    /// Resolves the expiry, mapping a missing `exp` to the perpetual sentinel.
    pub fn expires_at(&self) -> LicenseResult<DateTime<Utc>> {
        match self.exp {
            None => Ok(perpetual_expiry()),
            Some(secs) => Utc
                .timestamp_opt(secs, 0)
                .single()
                .ok_or_else(|| LicenseError::Malformed(format!("expiry out of range: {secs}"))),
        }
    }
}

/// A token whose signature has been checked against a trusted key.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    payload: LicensePayload,
}

impl VerifiedToken {
    /// Returns the verified payload.
    #[must_use]
    pub fn payload(&self) -> &LicensePayload {
        &self.payload
    }

    /// Binds the payload to an installation, rejecting it if already expired at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Malformed`] for out-of-range fields and
    /// [`LicenseError::Expired`] if `now` is past the expiry.
    pub fn bind(self, instance_id: &str, now: DateTime<Utc>) -> LicenseResult<LicenseInfo> {
        let expires_at = self.payload.expires_at()?;
        if now > expires_at {
            return Err(LicenseError::Expired(expires_at.to_rfc3339()));
        }

        let LicensePayload {
            lid,
            customer,
            seats,
            features,
            ..
        } = self.payload;

        Ok(LicenseInfo::new(
            lid,
            customer.unwrap_or_default(),
            expires_at,
            seats,
            features.into_iter().collect::<BTreeSet<_>>(),
            instance_id.to_string(),
        ))
    }
}

/// Codec for signed license tokens.
pub struct LicenseToken;

impl LicenseToken {
    /// Parses and verifies a token using the embedded public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed or signature verification fails.
    pub fn verify(token: &str) -> LicenseResult<VerifiedToken> {
        Self::verify_with_key(token, &LICENSE_PUBLIC_KEY)
    }

    /// Parses and verifies a token using a custom public key.
    /// Used for testing with a generated key pair.
    pub fn verify_with_key(token: &str, pub_key_bytes: &[u8; 32]) -> LicenseResult<VerifiedToken> {
        let token = token.trim();

        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(LicenseError::Malformed(
                "token must have exactly three parts separated by dots".to_string(),
            ));
        }

        let (header_b64, payload_b64, signature_b64) = (parts[0], parts[1], parts[2]);

        let header_json = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|e| LicenseError::Malformed(format!("invalid header base64: {e}")))?;
        let header: TokenHeader = serde_json::from_slice(&header_json)
            .map_err(|e| LicenseError::Malformed(format!("invalid header JSON: {e}")))?;
        if header.alg != TOKEN_ALG {
            return Err(LicenseError::Malformed(format!(
                "unsupported signature algorithm: {}",
                header.alg
            )));
        }

        let sig_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| LicenseError::Malformed(format!("invalid signature base64: {e}")))?;
        let signature = Signature::from_slice(&sig_bytes)
            .map_err(|_| LicenseError::Malformed("invalid signature length".to_string()))?;

        let verifying_key = VerifyingKey::from_bytes(pub_key_bytes)
            .map_err(|_| LicenseError::Malformed("invalid public key".to_string()))?;

        let signed_len = header_b64.len() + 1 + payload_b64.len();
        verifying_key
            .verify(&token.as_bytes()[..signed_len], &signature)
            .map_err(|_| LicenseError::InvalidSignature)?;

        let payload_json = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|e| LicenseError::Malformed(format!("invalid payload base64: {e}")))?;
        let payload: LicensePayload = serde_json::from_slice(&payload_json)?;

        if payload.seats == 0 {
            return Err(LicenseError::Malformed("seat count must be positive".to_string()));
        }

        Ok(VerifiedToken { payload })
    }

    /// Signs a payload, producing a token string.
    ///
    /// Issuance happens outside this system; this exists for tooling and tests.
    pub fn sign(signing_key: &SigningKey, payload: &LicensePayload) -> LicenseResult<String> {
        let header = TokenHeader {
            alg: TOKEN_ALG.to_string(),
            typ: Some(TOKEN_TYP.to_string()),
        };
        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);
        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature = signing_key.sign(signing_input.as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());
        Ok(format!("{signing_input}.{sig_b64}"))
    }
}
