// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository (`users` collection).

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::Collection;
use serde::{Deserialize, Serialize};

use super::super::{DatabaseClient, DbResult};
use crate::models::WalletAddress;

/// A wallet that has signed in at least once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredUser {
    pub wallet_address: String,
    pub created_at: bson::DateTime,
    pub last_login_at: bson::DateTime,
}

fn login_update(now: DateTime<Utc>) -> Document {
    let now = bson::DateTime::from_chrono(now);
    doc! {
        "$set": { "last_login_at": now },
        "$setOnInsert": { "created_at": now },
    }
}

/// Repository for wallet users.
pub struct UserRepository<'a> {
    client: &'a DatabaseClient,
}

impl<'a> UserRepository<'a> {
    pub fn new(client: &'a DatabaseClient) -> Self {
        Self { client }
    }

    fn collection(&self) -> Collection<StoredUser> {
        self.client.users().clone_with_type()
    }

    /// Record a successful sign-in, creating the user on first login.
    pub async fn record_login(&self, wallet: &WalletAddress, now: DateTime<Utc>) -> DbResult<()> {
        self.collection()
            .update_one(doc! { "wallet_address": wallet.as_str() }, login_update(now))
            .upsert(true)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_update_only_sets_created_at_on_insert() {
        let now: DateTime<Utc> = "2026-03-01T12:00:00Z".parse().unwrap();
        let update = login_update(now);

        let set = update.get_document("$set").unwrap();
        assert!(set.contains_key("last_login_at"));
        assert!(!set.contains_key("created_at"));

        let on_insert = update.get_document("$setOnInsert").unwrap();
        assert_eq!(on_insert.get_datetime("created_at").unwrap().to_chrono(), now);
    }
}
