// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Index definitions for the FuseVault collections.

use std::time::Duration;

use bson::{doc, Document};
use mongodb::{options::IndexOptions, IndexModel};

use super::{DatabaseClient, DbResult};

fn unique(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn plain(keys: Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

/// Indexes for the `auth` collection: one nonce per wallet.
pub fn auth_indexes() -> Vec<IndexModel> {
    vec![unique(doc! { "wallet_address": 1 })]
}

/// Indexes for the `sessions` collection.
///
/// The TTL index lets the server drop sessions once `expires_at` passes.
/// Reads never depend on it: expiry is checked on every lookup.
pub fn session_indexes() -> Vec<IndexModel> {
    vec![
        unique(doc! { "session_id": 1 }),
        plain(doc! { "wallet_address": 1 }),
        IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .options(
                IndexOptions::builder()
                    .expire_after(Duration::from_secs(0))
                    .build(),
            )
            .build(),
    ]
}

/// Indexes for the `users` collection.
pub fn user_indexes() -> Vec<IndexModel> {
    vec![unique(doc! { "wallet_address": 1 })]
}

/// Indexes for the `api_keys` collection.
///
/// Names are unique per wallet among active keys only, so a revoked key's
/// name can be reused.
pub fn api_key_indexes() -> Vec<IndexModel> {
    vec![
        unique(doc! { "key_hash": 1 }),
        IndexModel::builder()
            .keys(doc! { "wallet_address": 1, "name": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "is_active": true })
                    .build(),
            )
            .build(),
    ]
}

/// Create every index. Existing identical indexes are left untouched.
pub async fn ensure_indexes(client: &DatabaseClient) -> DbResult<()> {
    client.auth().create_indexes(auth_indexes()).await?;
    client.sessions().create_indexes(session_indexes()).await?;
    client.users().create_indexes(user_indexes()).await?;
    client.api_keys().create_indexes(api_key_indexes()).await?;

    tracing::debug!(db_name = %client.db_name(), "MongoDB indexes ensured");
    Ok(())
}
