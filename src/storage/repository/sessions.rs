// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session repository (`sessions` collection).
//!
//! A stored `is_active = true` is not enough to use a session: every lookup
//! also checks `expires_at`. Sessions found expired but still flagged active
//! are deactivated on the way out.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::Collection;
use serde::{Deserialize, Serialize};

use super::super::{DatabaseClient, DbResult};
use crate::models::{Session, WalletAddress};

/// Session document stored in `sessions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub session_id: String,
    pub wallet_address: String,
    pub created_at: bson::DateTime,
    pub expires_at: bson::DateTime,
    pub is_active: bool,
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id.clone(),
            wallet_address: session.wallet_address.0.clone(),
            created_at: bson::DateTime::from_chrono(session.created_at),
            expires_at: bson::DateTime::from_chrono(session.expires_at),
            is_active: session.is_active,
        }
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            session_id: stored.session_id,
            wallet_address: WalletAddress(stored.wallet_address),
            created_at: stored.created_at.to_chrono(),
            expires_at: stored.expires_at.to_chrono(),
            is_active: stored.is_active,
        }
    }
}

fn id_filter(session_id: &str) -> Document {
    doc! { "session_id": session_id }
}

fn deactivate_update() -> Document {
    doc! { "$set": { "is_active": false } }
}

/// Repository for wallet sessions.
pub struct SessionRepository<'a> {
    client: &'a DatabaseClient,
}

impl<'a> SessionRepository<'a> {
    pub fn new(client: &'a DatabaseClient) -> Self {
        Self { client }
    }

    fn collection(&self) -> Collection<StoredSession> {
        self.client.sessions().clone_with_type()
    }

    pub async fn create(&self, session: &Session) -> DbResult<()> {
        self.collection()
            .insert_one(StoredSession::from(session))
            .await?;
        Ok(())
    }

    /// Fetch a session regardless of state.
    pub async fn get(&self, session_id: &str) -> DbResult<Option<Session>> {
        let stored = self.collection().find_one(id_filter(session_id)).await?;
        Ok(stored.map(Session::from))
    }

    /// Fetch a session only if it can still be used at `now`.
    pub async fn find_usable(&self, session_id: &str, now: DateTime<Utc>) -> DbResult<Option<Session>> {
        let Some(session) = self.get(session_id).await? else {
            return Ok(None);
        };

        if session.is_usable(now) {
            return Ok(Some(session));
        }

        if session.is_active {
            tracing::debug!(
                session_id = %session.session_id,
                wallet = %session.wallet_address,
                "Deactivating expired session"
            );
            self.deactivate(&session.session_id).await?;
        }
        Ok(None)
    }

    /// Mark a session inactive. Returns whether it was active.
    pub async fn deactivate(&self, session_id: &str) -> DbResult<bool> {
        let mut filter = id_filter(session_id);
        filter.insert("is_active", true);

        let result = self
            .collection()
            .update_one(filter, deactivate_update())
            .await?;
        Ok(result.modified_count > 0)
    }

    /// Mark every active session of a wallet inactive.
    pub async fn deactivate_all_for_wallet(&self, wallet: &WalletAddress) -> DbResult<u64> {
        let result = self
            .collection()
            .update_many(
                doc! { "wallet_address": wallet.as_str(), "is_active": true },
                deactivate_update(),
            )
            .await?;
        Ok(result.modified_count)
    }
}
