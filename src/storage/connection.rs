// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! MongoDB connection manager.
//!
//! [`ConnectionManager`] owns the single process-wide [`DatabaseClient`].
//! The client is built on the first [`ConnectionManager::get_client`] call
//! and shared by every later caller until [`ConnectionManager::close`].
//!
//! Only construction and teardown are serialized. Queries run directly on
//! the driver, which is safe to share across tasks.

use std::sync::Arc;

use bson::{doc, Document};
use mongodb::{options::ClientOptions, Client, Collection, Database};
use tokio::sync::Mutex;

use super::{DbError, DbResult};
use crate::config::{redact_uri, DatabaseConfig};

/// Collection holding digital asset records.
pub const ASSETS_COLLECTION: &str = "assets";
/// Collection holding outstanding authentication nonces.
pub const AUTH_COLLECTION: &str = "auth";
/// Collection holding wallet sessions.
pub const SESSIONS_COLLECTION: &str = "sessions";
/// Collection holding asset transaction history.
pub const TRANSACTIONS_COLLECTION: &str = "transactions";
/// Collection holding known wallet users.
pub const USERS_COLLECTION: &str = "users";
/// Collection holding hashed API keys.
pub const API_KEYS_COLLECTION: &str = "api_keys";

const APP_NAME: &str = "fusevault-server";

/// An open MongoDB client with its resolved collection handles.
#[derive(Debug, Clone)]
pub struct DatabaseClient {
    client: Client,
    db: Database,
    assets: Collection<Document>,
    auth: Collection<Document>,
    sessions: Collection<Document>,
    transactions: Collection<Document>,
    users: Collection<Document>,
    api_keys: Collection<Document>,
}

impl DatabaseClient {
    /// Build a client from configuration.
    ///
    /// Parsing failures surface as [`DbError::InvalidUri`]. When
    /// `verify_on_connect` is set the server is pinged and an unreachable
    /// host surfaces as [`DbError::Unreachable`]. Errors are logged here and
    /// returned unchanged; there is no retry.
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        match Self::try_connect(config).await {
            Ok(client) => {
                tracing::info!(
                    db_name = %config.db_name,
                    uri = %redact_uri(&config.uri),
                    "Connected to MongoDB"
                );
                Ok(client)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    uri = %redact_uri(&config.uri),
                    "Failed to connect to MongoDB"
                );
                Err(e)
            }
        }
    }

    async fn try_connect(config: &DatabaseConfig) -> DbResult<Self> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(DbError::InvalidUri)?;
        if options.app_name.is_none() {
            options.app_name = Some(APP_NAME.to_string());
        }

        let client = Client::with_options(options).map_err(DbError::InvalidUri)?;
        let db = client.database(&config.db_name);

        if config.verify_on_connect {
            db.run_command(doc! { "ping": 1 })
                .await
                .map_err(DbError::Unreachable)?;
        }

        Ok(Self {
            assets: db.collection(ASSETS_COLLECTION),
            auth: db.collection(AUTH_COLLECTION),
            sessions: db.collection(SESSIONS_COLLECTION),
            transactions: db.collection(TRANSACTIONS_COLLECTION),
            users: db.collection(USERS_COLLECTION),
            api_keys: db.collection(API_KEYS_COLLECTION),
            client,
            db,
        })
    }

    /// Name of the database every collection lives in.
    pub fn db_name(&self) -> &str {
        self.db.name()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn assets(&self) -> &Collection<Document> {
        &self.assets
    }

    pub fn auth(&self) -> &Collection<Document> {
        &self.auth
    }

    pub fn sessions(&self) -> &Collection<Document> {
        &self.sessions
    }

    pub fn transactions(&self) -> &Collection<Document> {
        &self.transactions
    }

    pub fn users(&self) -> &Collection<Document> {
        &self.users
    }

    pub fn api_keys(&self) -> &Collection<Document> {
        &self.api_keys
    }

    /// Round-trip a `ping` command to the server.
    pub async fn ping(&self) -> DbResult<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn shutdown(&self) {
        self.client.clone().shutdown().await;
    }
}

/// Owner of the process-wide [`DatabaseClient`].
///
/// Build one in `main`, share it through `AppState`.
#[derive(Debug)]
pub struct ConnectionManager {
    config: DatabaseConfig,
    client: Mutex<Option<Arc<DatabaseClient>>>,
}

impl ConnectionManager {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            client: Mutex::new(None),
        }
    }

    /// Return the shared client, building it on first use.
    ///
    /// Concurrent callers wait on the same lock, so at most one client is
    /// ever constructed. A failed construction leaves the manager empty and
    /// the next call tries again from scratch.
    pub async fn get_client(&self) -> DbResult<Arc<DatabaseClient>> {
        let mut slot = self.client.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }

        let client = Arc::new(DatabaseClient::connect(&self.config).await?);
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Whether a client is currently open.
    pub async fn is_connected(&self) -> bool {
        self.client.lock().await.is_some()
    }

    /// Shut the client down. Does nothing if no client was ever opened.
    pub async fn close(&self) {
        let client = self.client.lock().await.take();
        match client {
            Some(client) => {
                client.shutdown().await;
                tracing::info!(db_name = %self.config.db_name, "MongoDB connection closed");
            }
            None => tracing::debug!("MongoDB close requested with no open connection"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Client options are parsed locally and no server round-trip happens.
    fn offline_config() -> DatabaseConfig {
        DatabaseConfig {
            verify_on_connect: false,
            ..DatabaseConfig::default()
        }
    }

    #[tokio::test]
    async fn get_client_returns_same_instance() {
        let manager = ConnectionManager::new(offline_config());

        let first = manager.get_client().await.unwrap();
        let second = manager.get_client().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        manager.close().await;
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_client() {
        let manager = Arc::new(ConnectionManager::new(offline_config()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.get_client().await.unwrap() })
            })
            .collect();

        let mut clients = Vec::new();
        for handle in handles {
            clients.push(handle.await.unwrap());
        }

        let first = &clients[0];
        assert!(clients.iter().all(|c| Arc::ptr_eq(c, first)));
        manager.close().await;
    }

    #[tokio::test]
    async fn close_before_connect_is_a_no_op() {
        let manager = ConnectionManager::new(offline_config());
        manager.close().await;
        manager.close().await;
        assert!(!manager.is_connected().await);
    }

    #[tokio::test]
    async fn close_then_get_opens_a_fresh_client() {
        let manager = ConnectionManager::new(offline_config());
        let first = manager.get_client().await.unwrap();
        manager.close().await;
        assert!(!manager.is_connected().await);

        let second = manager.get_client().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        manager.close().await;
    }

    #[tokio::test]
    async fn invalid_uri_fails_and_leaves_manager_empty() {
        let manager = ConnectionManager::new(DatabaseConfig {
            uri: "postgres://not-mongo".to_string(),
            ..offline_config()
        });

        let err = manager.get_client().await.unwrap_err();
        assert!(matches!(err, DbError::InvalidUri(_)));
        assert!(!manager.is_connected().await);
    }

    #[tokio::test]
    async fn client_exposes_named_collections() {
        let manager = ConnectionManager::new(offline_config());
        let client = manager.get_client().await.unwrap();

        assert_eq!(client.db_name(), "fusevault");
        assert_eq!(client.assets().name(), "assets");
        assert_eq!(client.auth().name(), "auth");
        assert_eq!(client.sessions().name(), "sessions");
        assert_eq!(client.transactions().name(), "transactions");
        assert_eq!(client.users().name(), "users");
        assert_eq!(client.api_keys().name(), "api_keys");
        manager.close().await;
    }

    #[tokio::test]
    async fn live_server_answers_ping() {
        let Ok(uri) = std::env::var("FUSEVAULT_TEST_MONGO_URI") else {
            return;
        };
        let manager = ConnectionManager::new(DatabaseConfig {
            uri,
            db_name: "fusevault_test".to_string(),
            verify_on_connect: true,
        });
        let client = manager.get_client().await.unwrap();
        client.ping().await.unwrap();
        manager.close().await;
    }
}
