// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request, response, and internal record shapes for the two FuseVault
//! domains handled here:
//!
//! - **API keys**: creation, update, persisted form, public projections
//! - **Wallet authentication**: nonce challenge, signed login, sessions
//!
//! Optional fields default to absent (`None`), never to a sentinel. All
//! timestamps are RFC 3339 date-times.
//!
//! Input types implement [`Validate`]; a failure names the offending field.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::auth::permissions::{default_permissions, Permission};
use crate::wire::{ExternalNames, FieldAliases};

/// Longest accepted API-key name.
pub const MAX_KEY_NAME_LEN: usize = 100;

// =============================================================================
// Validation
// =============================================================================

/// A field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Semantic checks run after deserialization.
pub trait Validate {
    fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError>;
}

// =============================================================================
// Wallet Address Type
// =============================================================================

/// Ethereum-compatible wallet address: `0x` followed by 40 hex characters.
///
/// Addresses are compared in lowercase form; use [`WalletAddress::parse`]
/// to validate and normalize untrusted input.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    /// Validate and lowercase an address.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        let hex = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .ok_or_else(|| ValidationError::new("wallet_address", "must start with 0x"))?;

        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::new(
                "wallet_address",
                "must be 0x followed by 40 hexadecimal characters",
            ));
        }

        Ok(WalletAddress(format!("0x{}", hex.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WalletAddress {
    fn from(value: String) -> Self {
        WalletAddress(value)
    }
}

impl From<&str> for WalletAddress {
    fn from(value: &str) -> Self {
        WalletAddress(value.to_string())
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

// =============================================================================
// API Key Models
// =============================================================================

fn validate_key_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("name", "must not be empty"));
    }
    if name.chars().count() > MAX_KEY_NAME_LEN {
        return Err(ValidationError::new(
            "name",
            format!("must be at most {MAX_KEY_NAME_LEN} characters"),
        ));
    }
    Ok(())
}

fn validate_permissions(permissions: &BTreeSet<Permission>) -> Result<(), ValidationError> {
    if permissions.is_empty() {
        return Err(ValidationError::new(
            "permissions",
            "must contain at least one permission",
        ));
    }
    Ok(())
}

fn validate_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<(), ValidationError> {
    match expires_at {
        Some(at) if at <= now => Err(ValidationError::new("expires_at", "must be in the future")),
        _ => Ok(()),
    }
}

/// Request to create a new API key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ApiKeyCreate {
    /// Human-readable name, unique among the wallet's active keys.
    pub name: String,
    /// Granted permissions. Defaults to `["read"]`.
    #[serde(default = "default_permissions")]
    pub permissions: BTreeSet<Permission>,
    /// When the key stops working. The server default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Free-form client metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Map<String, Value>>,
}

impl Validate for ApiKeyCreate {
    fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        validate_key_name(&self.name)?;
        validate_permissions(&self.permissions)?;
        validate_expiry(self.expires_at, now)
    }
}

/// Request to update an existing API key.
///
/// Absent fields are left unchanged. `permissions`, when present, replaces
/// the whole set: callers resend every permission they want to keep.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ApiKeyUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BTreeSet<Permission>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Map<String, Value>>,
}

impl ApiKeyUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.permissions.is_none()
            && self.expires_at.is_none()
            && self.metadata.is_none()
    }
}

impl Validate for ApiKeyUpdate {
    fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::new("body", "at least one field must be provided"));
        }
        if let Some(name) = &self.name {
            validate_key_name(name)?;
        }
        if let Some(permissions) = &self.permissions {
            validate_permissions(permissions)?;
        }
        validate_expiry(self.expires_at, now)
    }
}

/// Persisted API key.
///
/// Internal only: it carries `key_hash` and is never returned to clients.
/// The raw key is not part of this type.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiKeyInDb {
    pub key_hash: String,
    pub wallet_address: WalletAddress,
    pub name: String,
    pub permissions: BTreeSet<Permission>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub metadata: Option<Map<String, Value>>,
}

impl ApiKeyInDb {
    /// Build the record for a freshly issued key.
    pub fn new(
        key_hash: String,
        wallet_address: WalletAddress,
        request: ApiKeyCreate,
        default_lifetime: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            key_hash,
            wallet_address,
            name: request.name.trim().to_string(),
            permissions: request.permissions,
            created_at: now,
            last_used_at: None,
            expires_at: Some(
                request
                    .expires_at
                    .unwrap_or_else(|| saturating_add(now, default_lifetime)),
            ),
            is_active: true,
            metadata: request.metadata,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Active and not past its expiry.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }
}

/// Public view of an API key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ApiKeyResponse {
    pub name: String,
    pub wallet_address: WalletAddress,
    pub permissions: BTreeSet<Permission>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Map<String, Value>>,
}

impl From<ApiKeyInDb> for ApiKeyResponse {
    fn from(key: ApiKeyInDb) -> Self {
        Self {
            name: key.name,
            wallet_address: key.wallet_address,
            permissions: key.permissions,
            created_at: key.created_at,
            last_used_at: key.last_used_at,
            expires_at: key.expires_at,
            is_active: key.is_active,
            metadata: key.metadata,
        }
    }
}

/// Response to a successful key creation.
///
/// The only response that ever carries the raw key. It is built by
/// consuming the [`crate::auth::api_keys::RawApiKey`] and is not `Clone`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiKeyCreateResponse {
    #[serde(flatten)]
    pub key: ApiKeyResponse,
    /// The raw API key. Shown once; store it now.
    pub api_key: String,
}

// =============================================================================
// Wallet Authentication Models
// =============================================================================

/// Nonce challenge for a wallet sign-in attempt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct NonceResponse {
    pub wallet_address: WalletAddress,
    /// Single-use value to embed in the signed message.
    pub nonce: u32,
}

/// Signed response to a nonce challenge.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticationRequest {
    pub wallet_address: WalletAddress,
    /// 65-byte `personal_sign` signature, hex with `0x` prefix.
    pub signature: String,
}

impl Validate for AuthenticationRequest {
    fn validate(&self, _now: DateTime<Utc>) -> Result<(), ValidationError> {
        WalletAddress::parse(&self.wallet_address.0)?;

        let hex = self
            .signature
            .strip_prefix("0x")
            .unwrap_or(&self.signature);
        if hex.len() != 130 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::new(
                "signature",
                "must be a 65-byte hex signature",
            ));
        }
        Ok(())
    }
}

/// Outcome of a sign-in attempt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AuthenticationResponse {
    pub status: String,
    pub message: String,
    pub wallet_address: WalletAddress,
}

/// Outcome of a logout.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct LogoutResponse {
    pub status: String,
    pub message: String,
}

/// `at + delta`, pinned to the far end of the calendar instead of panicking.
fn saturating_add(at: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    at.checked_add_signed(delta).unwrap_or(if delta < Duration::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

// =============================================================================
// Session Models
// =============================================================================

/// A wallet session.
///
/// `expires_at` is always after `created_at`. Usability is derived: a
/// session past `expires_at` is expired whatever `is_active` says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub wallet_address: WalletAddress,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Session {
    /// Start a new session. A non-positive `ttl` is clamped to one second.
    pub fn start(wallet_address: WalletAddress, ttl: Duration, now: DateTime<Utc>) -> Self {
        let ttl = ttl.max(Duration::seconds(1));
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            wallet_address,
            created_at: now,
            expires_at: saturating_add(now, ttl),
            is_active: true,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Active, unexpired, and well-formed.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now) && self.expires_at > self.created_at
    }
}

/// Session details returned to the frontend.
///
/// Serialized through [`crate::wire::Wire`], which renames the fields to
/// camelCase using [`SessionResponse::ALIASES`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SessionResponse {
    pub session_id: String,
    pub wallet_address: WalletAddress,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

impl ExternalNames for SessionResponse {
    const ALIASES: FieldAliases = FieldAliases::new(&[
        ("session_id", "sessionId"),
        ("wallet_address", "walletAddress"),
        ("created_at", "createdAt"),
        ("expires_at", "expiresAt"),
        ("is_active", "isActive"),
    ]);
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.session_id,
            wallet_address: session.wallet_address,
            created_at: session.created_at,
            expires_at: session.expires_at,
            is_active: session.is_active,
        }
    }
}
