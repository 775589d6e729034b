// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated callers.
//!
//! Use `SessionAuth` for browser-only endpoints and `Caller` where API keys
//! are also accepted:
//!
//! ```rust,ignore
//! async fn my_handler(SessionAuth(session): SessionAuth) -> impl IntoResponse {
//!     // session.wallet_address is the signed-in wallet
//! }
//! ```

use std::collections::BTreeSet;

use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts, HeaderMap},
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use super::api_keys::looks_like_api_key;
use super::permissions::{grants, Permission};
use super::AuthError;
use crate::models::{Session, WalletAddress};
use crate::state::AppState;
use crate::storage::{ApiKeyRepository, SessionRepository};

/// Name of the session cookie set at login.
pub const SESSION_COOKIE: &str = "session_id";

/// Header carrying a raw API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Value of the session cookie, if the request carries one.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Load the usable session named by the request's cookie.
async fn resolve_session(session_id: &str, state: &AppState) -> Result<Session, AuthError> {
    let client = state.db().await?;
    SessionRepository::new(&client)
        .find_usable(session_id, Utc::now())
        .await?
        .ok_or(AuthError::InvalidSession)
}

/// Extractor for a signed-in wallet session.
///
/// Rejects with `MissingSession` before touching the database when no
/// cookie is present.
pub struct SessionAuth(pub Session);

impl FromRequestParts<AppState> for SessionAuth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session_id = session_cookie(&parts.headers).ok_or(AuthError::MissingSession)?;
        Ok(SessionAuth(resolve_session(&session_id, state).await?))
    }
}

/// How a caller proved its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Session,
    ApiKey,
}

/// A caller authenticated by session cookie or API key.
///
/// Sessions carry every permission; API keys carry the permissions they
/// were issued with. The `X-API-Key` header wins when both are present.
#[derive(Debug, Clone)]
pub struct Caller {
    pub wallet_address: WalletAddress,
    pub method: AuthMethod,
    pub permissions: BTreeSet<Permission>,
}

impl Caller {
    pub fn from_session(session: Session) -> Self {
        Self {
            wallet_address: session.wallet_address,
            method: AuthMethod::Session,
            permissions: Permission::ALL.into_iter().collect(),
        }
    }

    /// Reject with `InsufficientPermissions` unless `required` is granted.
    pub fn require(&self, required: Permission) -> Result<(), AuthError> {
        if grants(&self.permissions, required) {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions)
        }
    }
}

async fn resolve_api_key(raw_key: &str, state: &AppState) -> Result<Caller, AuthError> {
    if !state.config.auth.api_keys_enabled || !looks_like_api_key(raw_key) {
        return Err(AuthError::InvalidApiKey);
    }

    let key_hash = state.hasher.hash(raw_key);
    let client = state.db().await?;
    let repo = ApiKeyRepository::new(&client);

    let key = repo
        .find_by_hash(&key_hash)
        .await?
        .ok_or(AuthError::InvalidApiKey)?;

    let now = Utc::now();
    if !key.is_active {
        return Err(AuthError::ApiKeyRevoked);
    }
    if key.is_expired(now) {
        return Err(AuthError::ApiKeyExpired);
    }

    repo.touch_last_used(&key_hash, now).await?;
    tracing::debug!(wallet = %key.wallet_address, key_name = %key.name, "API key accepted");

    Ok(Caller {
        wallet_address: key.wallet_address,
        method: AuthMethod::ApiKey,
        permissions: key.permissions,
    })
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(value) = parts.headers.get(API_KEY_HEADER) {
            let raw_key = value.to_str().map_err(|_| AuthError::InvalidApiKey)?;
            return resolve_api_key(raw_key.trim(), state).await;
        }

        let session_id = session_cookie(&parts.headers).ok_or(AuthError::MissingCredentials)?;
        let session = resolve_session(&session_id, state).await?;
        Ok(Caller::from_session(session))
    }
}
