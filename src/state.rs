// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::api_keys::ApiKeyHasher;
use crate::config::Config;
use crate::storage::{ConnectionManager, DatabaseClient, DbResult};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<ConnectionManager>,
    pub hasher: ApiKeyHasher,
}

impl AppState {
    pub fn new(config: Config, db: Arc<ConnectionManager>, hasher: ApiKeyHasher) -> Self {
        Self {
            config: Arc::new(config),
            db,
            hasher,
        }
    }

    /// The shared database client, connecting on first use.
    pub async fn db(&self) -> DbResult<Arc<DatabaseClient>> {
        self.db.get_client().await
    }
}
