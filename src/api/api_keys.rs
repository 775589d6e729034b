// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API-key management endpoints.
//!
//! Only a signed-in wallet session may manage keys; a key cannot mint or
//! revoke other keys. The routes are not mounted when `API_KEYS_ENABLED`
//! is false.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use super::extract::JsonBody;
use crate::{
    auth::{RawApiKey, SessionAuth},
    error::ApiError,
    models::{ApiKeyCreate, ApiKeyCreateResponse, ApiKeyInDb, ApiKeyResponse, ApiKeyUpdate, Validate},
    state::AppState,
    storage::ApiKeyRepository,
};

#[utoipa::path(
    post,
    path = "/v1/api-keys",
    request_body = ApiKeyCreate,
    tag = "API Keys",
    security(("session_cookie" = [])),
    responses(
        (status = 201, description = "Key created; `api_key` is shown only here", body = ApiKeyCreateResponse),
        (status = 401, description = "No usable session"),
        (status = 409, description = "An active key with this name exists"),
        (status = 422, description = "Invalid request or key limit reached")
    )
)]
pub async fn create_api_key(
    State(state): State<AppState>,
    SessionAuth(session): SessionAuth,
    JsonBody(request): JsonBody<ApiKeyCreate>,
) -> Result<(StatusCode, Json<ApiKeyCreateResponse>), ApiError> {
    let now = Utc::now();
    request.validate(now)?;

    let wallet = session.wallet_address;
    let settings = &state.config.auth;
    let client = state.db().await?;
    let repo = ApiKeyRepository::new(&client);

    let name = request.name.trim();
    if repo.find_by_name(&wallet, name).await?.is_some() {
        return Err(ApiError::conflict(format!("API key {name} already exists")).with_field("name"));
    }

    let active = repo.count_active(&wallet, now).await?;
    if active >= settings.api_key_max_per_wallet {
        return Err(ApiError::unprocessable(format!(
            "wallet already holds the maximum of {} active API keys",
            settings.api_key_max_per_wallet
        ))
        .with_field("body"));
    }

    let raw = RawApiKey::generate().map_err(|e| {
        tracing::error!(error = %e, "API key generation failed");
        ApiError::internal("could not generate API key")
    })?;
    let record = ApiKeyInDb::new(
        state.hasher.hash(raw.expose()),
        wallet,
        request,
        settings.api_key_default_expiration,
        now,
    );
    repo.insert(&record).await?;

    tracing::info!(
        wallet = %record.wallet_address,
        key_name = %record.name,
        permissions = ?record.permissions,
        "API key created"
    );
    Ok((StatusCode::CREATED, Json(raw.into_create_response(record))))
}

#[utoipa::path(
    get,
    path = "/v1/api-keys",
    tag = "API Keys",
    security(("session_cookie" = [])),
    responses(
        (status = 200, body = [ApiKeyResponse]),
        (status = 401, description = "No usable session")
    )
)]
pub async fn list_api_keys(
    State(state): State<AppState>,
    SessionAuth(session): SessionAuth,
) -> Result<Json<Vec<ApiKeyResponse>>, ApiError> {
    let client = state.db().await?;
    let keys = ApiKeyRepository::new(&client)
        .list_by_wallet(&session.wallet_address)
        .await?;
    Ok(Json(keys.into_iter().map(ApiKeyResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/v1/api-keys/{name}",
    params(
        ("name" = String, Path, description = "Name of the active key to update")
    ),
    request_body = ApiKeyUpdate,
    tag = "API Keys",
    security(("session_cookie" = [])),
    responses(
        (status = 200, body = ApiKeyResponse),
        (status = 404, description = "No active key with this name"),
        (status = 409, description = "New name is taken"),
        (status = 422, description = "Invalid update")
    )
)]
pub async fn update_api_key(
    Path(name): Path<String>,
    State(state): State<AppState>,
    SessionAuth(session): SessionAuth,
    JsonBody(update): JsonBody<ApiKeyUpdate>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    update.validate(Utc::now())?;

    let client = state.db().await?;
    let key = ApiKeyRepository::new(&client)
        .update(&session.wallet_address, &name, &update)
        .await?;

    tracing::info!(wallet = %key.wallet_address, key_name = %key.name, "API key updated");
    Ok(Json(key.into()))
}

#[utoipa::path(
    delete,
    path = "/v1/api-keys/{name}",
    params(
        ("name" = String, Path, description = "Name of the active key to revoke")
    ),
    tag = "API Keys",
    security(("session_cookie" = [])),
    responses(
        (status = 204),
        (status = 404, description = "No active key with this name")
    )
)]
pub async fn delete_api_key(
    Path(name): Path<String>,
    State(state): State<AppState>,
    SessionAuth(session): SessionAuth,
) -> Result<StatusCode, ApiError> {
    let client = state.db().await?;
    let revoked = ApiKeyRepository::new(&client)
        .revoke(&session.wallet_address, &name)
        .await?;

    if !revoked {
        return Err(ApiError::not_found(format!("API key {name} not found")));
    }

    tracing::info!(wallet = %session.wallet_address, key_name = %name, "API key revoked");
    Ok(StatusCode::NO_CONTENT)
}
