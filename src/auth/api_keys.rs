// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API-key generation and hashing.
//!
//! ## Key Lifecycle
//!
//! 1. [`RawApiKey::generate`] draws 32 bytes from the system RNG and encodes
//!    them as `fv.<base64url>`.
//! 2. [`ApiKeyHasher::hash`] computes `HMAC-SHA256(secret, raw)` as hex;
//!    only this hash is stored.
//! 3. The raw key is moved into the creation response and dropped.
//!
//! Presented keys are re-hashed and looked up by hash. Without the server
//! secret a stored hash cannot be checked against guesses.

use std::fmt;

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;

use crate::models::{ApiKeyCreateResponse, ApiKeyInDb, ApiKeyResponse};

/// Prefix identifying FuseVault API keys.
pub const API_KEY_PREFIX: &str = "fv.";

/// Number of random bytes in a raw key.
const API_KEY_BYTES: usize = 32;

/// Length of a generated HMAC secret.
const SECRET_BYTES: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Errors raised while generating key material.
#[derive(Debug, thiserror::Error)]
pub enum KeyMaterialError {
    #[error("system random number generator failed")]
    Rng,

    #[error("API key secret must not be empty")]
    EmptySecret,
}

/// A freshly generated API key.
///
/// Neither `Clone` nor `Display`; `Debug` is redacted. The value leaves this
/// type only by being moved into an [`ApiKeyCreateResponse`].
pub struct RawApiKey(String);

impl RawApiKey {
    pub fn generate() -> Result<Self, KeyMaterialError> {
        let mut bytes = [0u8; API_KEY_BYTES];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| KeyMaterialError::Rng)?;
        Ok(Self(format!(
            "{API_KEY_PREFIX}{}",
            Base64UrlUnpadded::encode_string(&bytes)
        )))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Build the one response that carries the raw key.
    pub fn into_create_response(self, record: ApiKeyInDb) -> ApiKeyCreateResponse {
        ApiKeyCreateResponse {
            key: ApiKeyResponse::from(record),
            api_key: self.0,
        }
    }
}

impl fmt::Debug for RawApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawApiKey(<redacted>)")
    }
}

/// Whether a presented value has the shape of a FuseVault key.
pub fn looks_like_api_key(value: &str) -> bool {
    value
        .strip_prefix(API_KEY_PREFIX)
        .is_some_and(|body| !body.is_empty() && Base64UrlUnpadded::decode_vec(body).is_ok())
}

/// Keyed hasher for API keys.
#[derive(Clone)]
pub struct ApiKeyHasher {
    mac: HmacSha256,
}

impl ApiKeyHasher {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, KeyMaterialError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(KeyMaterialError::EmptySecret);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| KeyMaterialError::EmptySecret)?;
        Ok(Self { mac })
    }

    /// Hasher with a random secret. Keys hashed with it stop verifying
    /// once the process exits.
    pub fn ephemeral() -> Result<Self, KeyMaterialError> {
        let mut secret = [0u8; SECRET_BYTES];
        SystemRandom::new()
            .fill(&mut secret)
            .map_err(|_| KeyMaterialError::Rng)?;
        Self::new(secret)
    }

    /// Hex-encoded `HMAC-SHA256(secret, raw_key)`.
    pub fn hash(&self, raw_key: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(raw_key.as_bytes());
        alloy::hex::encode(mac.finalize().into_bytes())
    }
}

impl fmt::Debug for ApiKeyHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKeyHasher(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::permissions::default_permissions;
    use crate::models::WalletAddress;
    use chrono::Utc;

    fn record(hash: String) -> ApiKeyInDb {
        ApiKeyInDb {
            key_hash: hash,
            wallet_address: WalletAddress::from("0x742d35cc6634c0532925a3b844bc9e7595f4ab12"),
            name: "deploy".into(),
            permissions: default_permissions(),
            created_at: Utc::now(),
            last_used_at: None,
            expires_at: None,
            is_active: true,
            metadata: None,
        }
    }

    #[test]
    fn generated_keys_are_prefixed_and_unique() {
        let a = RawApiKey::generate().unwrap();
        let b = RawApiKey::generate().unwrap();
        assert!(a.expose().starts_with(API_KEY_PREFIX));
        assert!(looks_like_api_key(a.expose()));
        assert_ne!(a.expose(), b.expose());
    }

    #[test]
    fn debug_output_is_redacted() {
        let key = RawApiKey::generate().unwrap();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains(key.expose()));
    }

    #[test]
    fn hash_is_deterministic_per_secret() {
        let hasher = ApiKeyHasher::new("secret-a").unwrap();
        let h1 = hasher.hash("fv.abc");
        let h2 = hasher.hash("fv.abc");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);

        let other = ApiKeyHasher::new("secret-b").unwrap();
        assert_ne!(h1, other.hash("fv.abc"));
        assert_ne!(h1, hasher.hash("fv.abd"));
    }

    #[test]
    fn create_response_carries_raw_key_once() {
        let hasher = ApiKeyHasher::new("secret").unwrap();
        let raw = RawApiKey::generate().unwrap();
        let raw_value = raw.expose().to_string();
        let record = record(hasher.hash(&raw_value));

        let json = serde_json::to_string(&raw.into_create_response(record)).unwrap();
        assert_eq!(json.matches(&raw_value).count(), 1);
        assert!(!json.contains("key_hash"));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(
            ApiKeyHasher::new(""),
            Err(KeyMaterialError::EmptySecret)
        ));
        assert!(ApiKeyHasher::ephemeral().is_ok());
    }

    #[test]
    fn looks_like_api_key_rejects_foreign_values() {
        assert!(!looks_like_api_key("Bearer abc"));
        assert!(!looks_like_api_key("fv."));
        assert!(!looks_like_api_key("fv.not base64!"));
    }
}
