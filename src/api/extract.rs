// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request body extractor with structured rejections.
//!
//! `axum::Json` rejects bodies with a plain-text message. `JsonBody` answers
//! with the same `{"error", "field"}` body as the other validation failures,
//! naming the field serde choked on.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
};
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::error::ApiError;

/// Field reported when the error is not tied to one member of the body.
const BODY_FIELD: &str = "body";

pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_json(req.headers()) {
            return Err(ApiError::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "expected `Content-Type: application/json`",
            )
            .with_field(BODY_FIELD));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::new(rejection.status(), rejection.body_text()))?;

        decode(&bytes).map(JsonBody)
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case("application/json")
        || essence.to_ascii_lowercase().ends_with("+json")
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(de).map_err(|e| {
        let field = field_of(&e);
        let inner = e.into_inner();
        match inner.classify() {
            Category::Data => ApiError::unprocessable(inner.to_string()).with_field(field),
            Category::Syntax | Category::Eof | Category::Io => {
                ApiError::bad_request(format!("malformed JSON body: {inner}")).with_field(BODY_FIELD)
            }
        }
    })
}

/// Dotted path of the offending field.
///
/// Missing and unknown fields are reported against their parent, so the
/// member name is taken from serde's message instead.
fn field_of(e: &serde_path_to_error::Error<serde_json::Error>) -> String {
    let parent = e.path().to_string();
    let parent = (parent != ".").then_some(parent);
    let message = e.inner().to_string();

    let member = ["missing field `", "unknown field `"]
        .iter()
        .find_map(|marker| message.strip_prefix(marker))
        .and_then(|rest| rest.split('`').next());

    match (parent, member) {
        (Some(parent), Some(member)) => format!("{parent}.{member}"),
        (None, Some(member)) => member.to_string(),
        (Some(parent), None) => parent,
        (None, None) => BODY_FIELD.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApiKeyCreate, AuthenticationRequest};

    #[test]
    fn missing_field_is_named() {
        let err = decode::<AuthenticationRequest>(
            br#"{"wallet_address":"0x742d35cc6634c0532925a3b844bc9e7595f4ab12"}"#,
        )
        .unwrap_err();

        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.field.as_deref(), Some("signature"));
    }

    #[test]
    fn bad_element_is_named_by_path() {
        let err = decode::<ApiKeyCreate>(br#"{"name":"ci","permissions":["read","root"]}"#)
            .unwrap_err();

        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.field.as_deref(), Some("permissions[1]"));
    }

    #[test]
    fn wrong_type_is_named_by_path() {
        let err = decode::<ApiKeyCreate>(br#"{"name":"ci","expires_at":42}"#).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("expires_at"));
    }

    #[test]
    fn syntax_error_is_a_bad_request() {
        let err = decode::<ApiKeyCreate>(br#"{"name":"#).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.field.as_deref(), Some("body"));
    }

    #[test]
    fn content_type_must_be_json() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));

        headers.insert(CONTENT_TYPE, "text/plain".parse().unwrap());
        assert!(!is_json(&headers));

        headers.insert(CONTENT_TYPE, "application/json; charset=utf-8".parse().unwrap());
        assert!(is_json(&headers));

        headers.insert(CONTENT_TYPE, "application/problem+json".parse().unwrap());
        assert!(is_json(&headers));
    }
}
