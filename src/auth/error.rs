// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
#[derive(Debug)]
pub enum AuthError {
    /// Neither a session cookie nor an API key was presented
    MissingCredentials,
    /// No session cookie present
    MissingSession,
    /// Session is unknown, logged out, or expired
    InvalidSession,
    /// API key is malformed or unknown
    InvalidApiKey,
    /// API key is past its expiry
    ApiKeyExpired,
    /// API key was revoked
    ApiKeyRevoked,
    /// No outstanding nonce for this wallet
    NonceNotFound,
    /// Signature does not recover to the claimed wallet
    InvalidSignature,
    /// Credentials lack the required permission
    InsufficientPermissions,
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::MissingSession => "missing_session",
            AuthError::InvalidSession => "invalid_session",
            AuthError::InvalidApiKey => "invalid_api_key",
            AuthError::ApiKeyExpired => "api_key_expired",
            AuthError::ApiKeyRevoked => "api_key_revoked",
            AuthError::NonceNotFound => "nonce_not_found",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials
            | AuthError::MissingSession
            | AuthError::InvalidSession
            | AuthError::InvalidApiKey
            | AuthError::ApiKeyExpired
            | AuthError::ApiKeyRevoked
            | AuthError::NonceNotFound
            | AuthError::InvalidSignature => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials => {
                write!(f, "A session cookie or X-API-Key header is required")
            }
            AuthError::MissingSession => write!(f, "No active session"),
            AuthError::InvalidSession => write!(f, "Session is invalid or expired"),
            AuthError::InvalidApiKey => write!(f, "API key is invalid"),
            AuthError::ApiKeyExpired => write!(f, "API key has expired"),
            AuthError::ApiKeyRevoked => write!(f, "API key has been revoked"),
            AuthError::NonceNotFound => {
                write!(f, "No pending nonce for this wallet; request a new one")
            }
            AuthError::InvalidSignature => write!(f, "Signature verification failed"),
            AuthError::InsufficientPermissions => {
                write!(f, "Insufficient permissions for this operation")
            }
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<crate::storage::DbError> for AuthError {
    fn from(e: crate::storage::DbError) -> Self {
        tracing::error!(error = %e, "Database error during authentication");
        AuthError::InternalError("database unavailable".to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_session_returns_401() {
        let response = AuthError::MissingSession.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "missing_session");
    }

    #[tokio::test]
    async fn insufficient_permissions_returns_403() {
        let response = AuthError::InsufficientPermissions.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn internal_error_hides_detail_from_code() {
        let err = AuthError::InternalError("boom".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "internal_error");
    }
}
