// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{process::ExitCode, sync::Arc};

use fusevault_server::{
    api::router,
    auth::ApiKeyHasher,
    config::Config,
    state::AppState,
    storage::{ensure_indexes, ConnectionManager},
    telemetry::init_tracing,
};
use tokio::signal;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(config.log_format) {
        eprintln!("Failed to initialize tracing: {e}");
        return ExitCode::FAILURE;
    }
    tracing::debug!(config = ?config, "Loaded configuration");

    // Connect eagerly so a bad MONGO_URI fails startup rather than the first request.
    let manager = Arc::new(ConnectionManager::new(config.database.clone()));
    let client = match manager.get_client().await {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Cannot start without MongoDB");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = ensure_indexes(&client).await {
        tracing::warn!(error = %e, "Failed to ensure MongoDB indexes");
    }

    let hasher = match &config.auth.api_key_secret {
        Some(secret) => ApiKeyHasher::new(secret),
        None => {
            tracing::warn!(
                "API_KEY_SECRET_KEY not set; using a per-process secret. \
                 API keys will stop working after a restart"
            );
            ApiKeyHasher::ephemeral()
        }
    };
    let hasher = match hasher {
        Ok(hasher) => hasher,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize API key hasher");
            return ExitCode::FAILURE;
        }
    };

    let addr = config.server.bind_address();
    let state = AppState::new(config, Arc::clone(&manager), hasher);
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %addr, "Failed to bind");
            manager.close().await;
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(addr = %addr, "FuseVault server listening (docs at /docs)");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    manager.close().await;

    match served {
        Ok(()) => {
            tracing::info!("Server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
