// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet sign-in and session endpoints.

use std::collections::BTreeSet;

use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::AppendHeaders,
    Json,
};
use chrono::{Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::extract::JsonBody;
use crate::{
    auth::{
        extractor::{session_cookie, SESSION_COOKIE},
        signature::{generate_nonce, verify_wallet_signature},
        AuthError, AuthMethod, Caller, Permission, SessionAuth,
    },
    error::ApiError,
    models::{
        AuthenticationRequest, AuthenticationResponse, LogoutResponse, NonceResponse, Session,
        SessionResponse, Validate, WalletAddress,
    },
    state::AppState,
    storage::{NonceRepository, SessionRepository, UserRepository},
    wire::Wire,
};

type CookieHeader = AppendHeaders<[(axum::http::HeaderName, HeaderValue); 1]>;

/// Response for GET /v1/auth/me
#[derive(Debug, Serialize, ToSchema)]
pub struct CallerResponse {
    pub wallet_address: WalletAddress,
    pub auth_method: AuthMethod,
    pub permissions: BTreeSet<Permission>,
}

impl From<Caller> for CallerResponse {
    fn from(caller: Caller) -> Self {
        Self {
            wallet_address: caller.wallet_address,
            auth_method: caller.method,
            permissions: caller.permissions,
        }
    }
}

fn build_cookie(value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value carrying a new session.
fn session_cookie_value(session_id: &str, ttl: Duration, secure: bool) -> String {
    build_cookie(session_id, ttl.num_seconds().max(1), secure)
}

/// `Set-Cookie` value that removes the session cookie.
fn cleared_cookie_value(secure: bool) -> String {
    build_cookie("", 0, secure)
}

fn cookie_header(value: String) -> Result<CookieHeader, ApiError> {
    let value = HeaderValue::from_str(&value)
        .map_err(|_| ApiError::internal("could not encode session cookie"))?;
    Ok(AppendHeaders([(SET_COOKIE, value)]))
}

#[utoipa::path(
    get,
    path = "/v1/auth/nonce/{wallet_address}",
    params(
        ("wallet_address" = String, Path, description = "Wallet requesting a sign-in challenge")
    ),
    tag = "Auth",
    responses(
        (status = 200, body = NonceResponse),
        (status = 422, description = "Malformed wallet address")
    )
)]
pub async fn get_nonce(
    Path(wallet_address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<NonceResponse>, ApiError> {
    let wallet = WalletAddress::parse(&wallet_address)?;
    let nonce = generate_nonce()?;

    let client = state.db().await?;
    NonceRepository::new(&client)
        .issue(&wallet, nonce, Utc::now())
        .await?;

    tracing::debug!(wallet = %wallet, "Issued sign-in nonce");
    Ok(Json(NonceResponse {
        wallet_address: wallet,
        nonce,
    }))
}

/// Verify a signed nonce and start a session.
///
/// The nonce is consumed on success; replaying the same signature fails.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = AuthenticationRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Signed in; `session_id` cookie set", body = AuthenticationResponse),
        (status = 401, description = "No pending nonce or bad signature"),
        (status = 422, description = "Malformed request")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<AuthenticationRequest>,
) -> Result<(CookieHeader, Json<AuthenticationResponse>), ApiError> {
    let now = Utc::now();
    request.validate(now)?;
    let wallet = WalletAddress::parse(request.wallet_address.as_str())?;

    let client = state.db().await?;
    let nonces = NonceRepository::new(&client);

    let nonce = nonces
        .current(&wallet)
        .await?
        .ok_or(AuthError::NonceNotFound)?;

    if let Err(e) = verify_wallet_signature(&wallet, nonce, &request.signature) {
        tracing::info!(wallet = %wallet, "Rejected sign-in: signature mismatch");
        return Err(e.into());
    }

    if !nonces.consume(&wallet, nonce).await? {
        return Err(AuthError::NonceNotFound.into());
    }

    UserRepository::new(&client).record_login(&wallet, now).await?;

    let settings = &state.config.auth;
    let session = Session::start(wallet.clone(), settings.session_ttl, now);
    SessionRepository::new(&client).create(&session).await?;

    tracing::info!(wallet = %wallet, "Wallet signed in");

    let cookie = cookie_header(session_cookie_value(
        &session.session_id,
        settings.session_ttl,
        settings.cookie_secure,
    ))?;
    Ok((
        cookie,
        Json(AuthenticationResponse {
            status: "success".to_string(),
            message: "Authentication successful".to_string(),
            wallet_address: wallet,
        }),
    ))
}

/// Current session, with camelCase field names.
#[utoipa::path(
    get,
    path = "/v1/auth/session",
    tag = "Auth",
    security(("session_cookie" = [])),
    responses(
        (status = 200, description = "Active session (camelCase fields)", body = SessionResponse),
        (status = 401, description = "No usable session")
    )
)]
pub async fn get_session(SessionAuth(session): SessionAuth) -> Json<Wire<SessionResponse>> {
    Json(Wire(session.into()))
}

/// End the current session, if any, and clear the cookie.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "Auth",
    responses((status = 200, body = LogoutResponse))
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(CookieHeader, Json<LogoutResponse>), ApiError> {
    if let Some(session_id) = session_cookie(&headers) {
        let client = state.db().await?;
        if SessionRepository::new(&client).deactivate(&session_id).await? {
            tracing::info!("Session ended");
        }
    }

    logged_out(state.config.auth.cookie_secure, "Logged out successfully")
}

/// End every active session of the signed-in wallet.
#[utoipa::path(
    post,
    path = "/v1/auth/logout/all",
    tag = "Auth",
    security(("session_cookie" = [])),
    responses(
        (status = 200, body = LogoutResponse),
        (status = 401, description = "No usable session")
    )
)]
pub async fn logout_all(
    State(state): State<AppState>,
    SessionAuth(session): SessionAuth,
) -> Result<(CookieHeader, Json<LogoutResponse>), ApiError> {
    let client = state.db().await?;
    let ended = SessionRepository::new(&client)
        .deactivate_all_for_wallet(&session.wallet_address)
        .await?;

    tracing::info!(wallet = %session.wallet_address, sessions = ended, "Signed out everywhere");
    logged_out(
        state.config.auth.cookie_secure,
        format!("Ended {ended} session(s)"),
    )
}

fn logged_out(
    secure: bool,
    message: impl Into<String>,
) -> Result<(CookieHeader, Json<LogoutResponse>), ApiError> {
    let cookie = cookie_header(cleared_cookie_value(secure))?;
    Ok((
        cookie,
        Json(LogoutResponse {
            status: "success".to_string(),
            message: message.into(),
        }),
    ))
}

/// Identity and permissions of the caller. API keys need `read`.
#[utoipa::path(
    get,
    path = "/v1/auth/me",
    tag = "Auth",
    security(("session_cookie" = []), ("api_key" = [])),
    responses(
        (status = 200, body = CallerResponse),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 403, description = "API key lacks the `read` permission")
    )
)]
pub async fn me(caller: Caller) -> Result<Json<CallerResponse>, AuthError> {
    caller.require(Permission::Read)?;
    Ok(Json(caller.into()))
}
