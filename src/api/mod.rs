// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi, ToSchema,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{extractor::SESSION_COOKIE, AuthMethod, Permission},
    config::ServerConfig,
    models::{
        ApiKeyCreate, ApiKeyCreateResponse, ApiKeyResponse, ApiKeyUpdate, AuthenticationRequest,
        AuthenticationResponse, LogoutResponse, NonceResponse, SessionResponse, WalletAddress,
    },
    state::AppState,
    wire::ExternalNames,
};

pub mod api_keys;
pub mod auth;
pub mod extract;
pub mod health;

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([ACCEPT, CONTENT_TYPE, HeaderName::from_static("x-api-key")])
}

pub fn router(state: AppState) -> Router {
    let mut v1_routes = Router::new()
        .route("/auth/nonce/{wallet_address}", get(auth::get_nonce))
        .route("/auth/login", post(auth::login))
        .route("/auth/session", get(auth::get_session))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/logout/all", post(auth::logout_all))
        .route("/auth/me", get(auth::me));

    if state.config.auth.api_keys_enabled {
        v1_routes = v1_routes
            .route(
                "/api-keys",
                get(api_keys::list_api_keys).post(api_keys::create_api_key),
            )
            .route(
                "/api-keys/{name}",
                put(api_keys::update_api_key).delete(api_keys::delete_api_key),
            );
    } else {
        tracing::info!("API keys disabled; /v1/api-keys not mounted");
    }

    let cors = cors_layer(&state.config.server);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
        );
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
        );
    }
}

/// Publishes `Wire` payloads under their external field names.
struct WireNamesAddon;

impl WireNamesAddon {
    fn rename<T: ToSchema + ExternalNames>(openapi: &mut utoipa::openapi::OpenApi) {
        let Some(components) = openapi.components.as_mut() else {
            return;
        };
        if let Some(schema) = components.schemas.get_mut(&*T::name()) {
            T::ALIASES.rename_schema(schema);
        }
    }
}

impl Modify for WireNamesAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        Self::rename::<SessionResponse>(openapi);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        auth::get_nonce,
        auth::login,
        auth::get_session,
        auth::logout,
        auth::logout_all,
        auth::me,
        api_keys::create_api_key,
        api_keys::list_api_keys,
        api_keys::update_api_key,
        api_keys::delete_api_key
    ),
    components(
        schemas(
            WalletAddress,
            Permission,
            AuthMethod,
            NonceResponse,
            AuthenticationRequest,
            AuthenticationResponse,
            LogoutResponse,
            SessionResponse,
            auth::CallerResponse,
            ApiKeyCreate,
            ApiKeyUpdate,
            ApiKeyResponse,
            ApiKeyCreateResponse,
            health::ReadyResponse,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon, &WireNamesAddon),
    tags(
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Auth", description = "Wallet sign-in and sessions"),
        (name = "API Keys", description = "API key management")
    )
)]
struct ApiDoc;
