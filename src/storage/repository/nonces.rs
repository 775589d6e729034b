// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Nonce repository (`auth` collection).
//!
//! Each wallet has at most one outstanding nonce. Issuing replaces it and a
//! successful sign-in deletes it, so a signature can be used only once.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::Collection;
use serde::{Deserialize, Serialize};

use super::super::{DatabaseClient, DbResult};
use crate::models::WalletAddress;

/// Nonce document stored in `auth`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNonce {
    pub wallet_address: String,
    /// Stored as a 64-bit integer; always within `u32` range.
    pub nonce: i64,
    pub created_at: bson::DateTime,
}

impl StoredNonce {
    pub fn nonce(&self) -> Option<u32> {
        u32::try_from(self.nonce).ok()
    }
}

fn wallet_filter(wallet: &WalletAddress) -> Document {
    doc! { "wallet_address": wallet.as_str() }
}

fn issue_update(nonce: u32, now: DateTime<Utc>) -> Document {
    doc! {
        "$set": {
            "nonce": i64::from(nonce),
            "created_at": bson::DateTime::from_chrono(now),
        }
    }
}

/// Repository for sign-in nonces.
pub struct NonceRepository<'a> {
    client: &'a DatabaseClient,
}

impl<'a> NonceRepository<'a> {
    pub fn new(client: &'a DatabaseClient) -> Self {
        Self { client }
    }

    fn collection(&self) -> Collection<StoredNonce> {
        self.client.auth().clone_with_type()
    }

    /// Store `nonce` as the wallet's outstanding challenge.
    pub async fn issue(&self, wallet: &WalletAddress, nonce: u32, now: DateTime<Utc>) -> DbResult<()> {
        self.client
            .auth()
            .update_one(wallet_filter(wallet), issue_update(nonce, now))
            .upsert(true)
            .await?;
        Ok(())
    }

    /// The wallet's outstanding nonce, if any.
    pub async fn current(&self, wallet: &WalletAddress) -> DbResult<Option<u32>> {
        let stored = self.collection().find_one(wallet_filter(wallet)).await?;
        Ok(stored.and_then(|n| n.nonce()))
    }

    /// Delete the nonce if it matches. Returns whether it was outstanding.
    pub async fn consume(&self, wallet: &WalletAddress, nonce: u32) -> DbResult<bool> {
        let mut filter = wallet_filter(wallet);
        filter.insert("nonce", i64::from(nonce));

        let removed = self.collection().find_one_and_delete(filter).await?;
        Ok(removed.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_update_sets_nonce_and_timestamp() {
        let now: DateTime<Utc> = "2026-03-01T12:00:00Z".parse().unwrap();
        let update = issue_update(99, now);
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_i64("nonce").unwrap(), 99);
        assert_eq!(
            set.get_datetime("created_at").unwrap().to_chrono(),
            now
        );
    }

    #[test]
    fn stored_nonce_round_trips_through_bson() {
        let stored = StoredNonce {
            wallet_address: "0xabc".into(),
            nonce: i64::from(u32::MAX),
            created_at: bson::DateTime::now(),
        };
        let document = bson::to_document(&stored).unwrap();
        let back: StoredNonce = bson::from_document(document).unwrap();
        assert_eq!(back.nonce(), Some(u32::MAX));
    }

    #[test]
    fn out_of_range_nonce_is_ignored() {
        let stored = StoredNonce {
            wallet_address: "0xabc".into(),
            nonce: -1,
            created_at: bson::DateTime::now(),
        };
        assert_eq!(stored.nonce(), None);
    }
}
