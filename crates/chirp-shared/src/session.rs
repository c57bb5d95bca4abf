use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::constants::PUBKEY_SIZE;
use crate::error::SessionError;
use crate::types::UserId;

// Token signed by the identity provider, client presents it as a bearer token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionToken {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub signature: Vec<u8>,
}

impl SessionToken {
    /// Encode for an `Authorization: Bearer` header (base64url of the JSON form).
    pub fn encode(&self) -> String {
        // Serializing a struct of strings and bytes cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(encoded: &str) -> Result<Self, SessionError> {
        let json = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|e| SessionError::Malformed(format!("base64: {e}")))?;
        serde_json::from_slice(&json).map_err(|e| SessionError::Malformed(format!("json: {e}")))
    }
}

// payload = user_id || 0x00 || expires_at (rfc3339)
fn signed_payload(user_id: &UserId, expires_at: &DateTime<Utc>) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(user_id.as_str().as_bytes());
    payload.push(0);
    payload.extend_from_slice(expires_at.to_rfc3339().as_bytes());
    payload
}

/// Verify a session token against the identity provider's public key and
/// return the authenticated user id.
pub fn verify_session_token(
    token: &SessionToken,
    provider_pubkey: &[u8; 32],
) -> Result<UserId, SessionError> {
    if Utc::now() > token.expires_at {
        return Err(SessionError::Expired);
    }

    let verifying_key =
        VerifyingKey::from_bytes(provider_pubkey).map_err(|_| SessionError::InvalidProviderKey)?;

    let signature =
        Signature::from_slice(&token.signature).map_err(|_| SessionError::InvalidSignature)?;

    let payload = signed_payload(&token.user_id, &token.expires_at);
    verifying_key
        .verify(&payload, &signature)
        .map_err(|_| SessionError::InvalidSignature)?;

    Ok(token.user_id.clone())
}

pub fn issue_session_token(
    user_id: &UserId,
    expires_at: DateTime<Utc>,
    provider_signing_key: &ed25519_dalek::SigningKey,
) -> SessionToken {
    use ed25519_dalek::Signer;

    let signature = provider_signing_key.sign(&signed_payload(user_id, &expires_at));

    SessionToken {
        user_id: user_id.clone(),
        expires_at,
        signature: signature.to_bytes().to_vec(),
    }
}

/// Parse a 64-character hex string into an Ed25519 public key.
pub fn parse_pubkey_hex(hex_str: &str) -> Result<[u8; PUBKEY_SIZE], SessionError> {
    let bytes = hex::decode(hex_str.trim())
        .map_err(|e| SessionError::Malformed(format!("invalid hex: {e}")))?;
    <[u8; PUBKEY_SIZE]>::try_from(bytes.as_slice()).map_err(|_| {
        SessionError::Malformed(format!(
            "expected {PUBKEY_SIZE} key bytes, got {}",
            bytes.len()
        ))
    })
}
