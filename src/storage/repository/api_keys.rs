// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API-key repository (`api_keys` collection).
//!
//! ## Security
//!
//! - Only `key_hash` is stored; the raw key never reaches this module
//! - Keys are soft-revoked (`is_active = false`) and kept for audit
//! - Names are unique among a wallet's active keys

use std::collections::BTreeSet;

use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use mongodb::{options::ReturnDocument, Collection};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::super::{DatabaseClient, DbError, DbResult};
use crate::auth::permissions::Permission;
use crate::models::{ApiKeyInDb, ApiKeyUpdate, WalletAddress};

/// API-key document stored in `api_keys`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredApiKey {
    pub key_hash: String,
    pub wallet_address: String,
    pub name: String,
    pub permissions: BTreeSet<Permission>,
    pub created_at: bson::DateTime,
    #[serde(default)]
    pub last_used_at: Option<bson::DateTime>,
    #[serde(default)]
    pub expires_at: Option<bson::DateTime>,
    pub is_active: bool,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl From<&ApiKeyInDb> for StoredApiKey {
    fn from(key: &ApiKeyInDb) -> Self {
        Self {
            key_hash: key.key_hash.clone(),
            wallet_address: key.wallet_address.0.clone(),
            name: key.name.clone(),
            permissions: key.permissions.clone(),
            created_at: bson::DateTime::from_chrono(key.created_at),
            last_used_at: key.last_used_at.map(bson::DateTime::from_chrono),
            expires_at: key.expires_at.map(bson::DateTime::from_chrono),
            is_active: key.is_active,
            metadata: key.metadata.clone(),
        }
    }
}

impl From<StoredApiKey> for ApiKeyInDb {
    fn from(stored: StoredApiKey) -> Self {
        Self {
            key_hash: stored.key_hash,
            wallet_address: WalletAddress(stored.wallet_address),
            name: stored.name,
            permissions: stored.permissions,
            created_at: stored.created_at.to_chrono(),
            last_used_at: stored.last_used_at.map(|d| d.to_chrono()),
            expires_at: stored.expires_at.map(|d| d.to_chrono()),
            is_active: stored.is_active,
            metadata: stored.metadata,
        }
    }
}

fn active_by_name(wallet: &WalletAddress, name: &str) -> Document {
    doc! { "wallet_address": wallet.as_str(), "name": name, "is_active": true }
}

fn usable_for_wallet(wallet: &WalletAddress, now: DateTime<Utc>) -> Document {
    doc! {
        "wallet_address": wallet.as_str(),
        "is_active": true,
        "$or": [
            { "expires_at": Bson::Null },
            { "expires_at": { "$gt": bson::DateTime::from_chrono(now) } },
        ],
    }
}

/// Translate a partial update into a `$set` document.
///
/// Absent fields are untouched; `permissions` replaces the stored set.
fn update_document(update: &ApiKeyUpdate) -> DbResult<Document> {
    let mut set = Document::new();
    if let Some(name) = &update.name {
        set.insert("name", name.trim());
    }
    if let Some(permissions) = &update.permissions {
        set.insert("permissions", bson::to_bson(permissions)?);
    }
    if let Some(expires_at) = update.expires_at {
        set.insert("expires_at", bson::DateTime::from_chrono(expires_at));
    }
    if let Some(metadata) = &update.metadata {
        set.insert("metadata", bson::to_bson(metadata)?);
    }
    Ok(doc! { "$set": set })
}

/// Repository for API keys.
pub struct ApiKeyRepository<'a> {
    client: &'a DatabaseClient,
}

impl<'a> ApiKeyRepository<'a> {
    pub fn new(client: &'a DatabaseClient) -> Self {
        Self { client }
    }

    fn collection(&self) -> Collection<StoredApiKey> {
        self.client.api_keys().clone_with_type()
    }

    /// Insert a new key.
    ///
    /// # Returns
    /// - `Err(DbError::AlreadyExists)` if the wallet has an active key with the same name
    pub async fn insert(&self, key: &ApiKeyInDb) -> DbResult<()> {
        self.collection()
            .insert_one(StoredApiKey::from(key))
            .await
            .map_err(|e| DbError::from_write(e, || format!("API key {}", key.name)))?;
        Ok(())
    }

    pub async fn find_by_hash(&self, key_hash: &str) -> DbResult<Option<ApiKeyInDb>> {
        let stored = self
            .collection()
            .find_one(doc! { "key_hash": key_hash })
            .await?;
        Ok(stored.map(ApiKeyInDb::from))
    }

    /// The wallet's active key with this name.
    pub async fn find_by_name(
        &self,
        wallet: &WalletAddress,
        name: &str,
    ) -> DbResult<Option<ApiKeyInDb>> {
        let stored = self
            .collection()
            .find_one(active_by_name(wallet, name))
            .await?;
        Ok(stored.map(ApiKeyInDb::from))
    }

    /// Every key of a wallet, newest first, including revoked ones.
    pub async fn list_by_wallet(&self, wallet: &WalletAddress) -> DbResult<Vec<ApiKeyInDb>> {
        let mut cursor = self
            .collection()
            .find(doc! { "wallet_address": wallet.as_str() })
            .sort(doc! { "created_at": -1 })
            .await?;

        let mut keys = Vec::new();
        while cursor.advance().await? {
            keys.push(ApiKeyInDb::from(cursor.deserialize_current()?));
        }
        Ok(keys)
    }

    /// Number of active, unexpired keys held by a wallet.
    pub async fn count_active(&self, wallet: &WalletAddress, now: DateTime<Utc>) -> DbResult<u64> {
        Ok(self
            .collection()
            .count_documents(usable_for_wallet(wallet, now))
            .await?)
    }

    /// Apply a partial update to an active key and return the new state.
    ///
    /// # Returns
    /// - `Err(DbError::NotFound)` if no active key has that name
    /// - `Err(DbError::AlreadyExists)` if a rename collides with another active key
    pub async fn update(
        &self,
        wallet: &WalletAddress,
        name: &str,
        update: &ApiKeyUpdate,
    ) -> DbResult<ApiKeyInDb> {
        self.collection()
            .find_one_and_update(active_by_name(wallet, name), update_document(update)?)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| {
                DbError::from_write(e, || {
                    format!("API key {}", update.name.as_deref().unwrap_or(name).trim())
                })
            })?
            .map(ApiKeyInDb::from)
            .ok_or_else(|| DbError::NotFound(format!("API key {name}")))
    }

    /// Soft-revoke an active key. Returns whether a key was revoked.
    pub async fn revoke(&self, wallet: &WalletAddress, name: &str) -> DbResult<bool> {
        let result = self
            .collection()
            .update_one(
                active_by_name(wallet, name),
                doc! { "$set": { "is_active": false } },
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    /// Record that a key was just used.
    pub async fn touch_last_used(&self, key_hash: &str, now: DateTime<Utc>) -> DbResult<()> {
        self.collection()
            .update_one(
                doc! { "key_hash": key_hash },
                doc! { "$set": { "last_used_at": bson::DateTime::from_chrono(now) } },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::api_keys::{ApiKeyHasher, RawApiKey};
    use crate::auth::permissions::default_permissions;
    use crate::models::ApiKeyCreate;
    use chrono::Duration;

    const ADDR: &str = "0x742d35cc6634c0532925a3b844bc9e7595f4ab12";

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    fn sample_key(raw: &RawApiKey) -> ApiKeyInDb {
        let hasher = ApiKeyHasher::new("test-secret").unwrap();
        let mut metadata = Map::new();
        metadata.insert("env".into(), Value::String("staging".into()));

        ApiKeyInDb::new(
            hasher.hash(raw.expose()),
            ADDR.into(),
            ApiKeyCreate {
                name: "deploy".into(),
                permissions: BTreeSet::from([Permission::Read, Permission::Write]),
                expires_at: None,
                metadata: Some(metadata),
            },
            Duration::days(30),
            now(),
        )
    }

    #[test]
    fn persisted_form_never_contains_raw_key() {
        let raw = RawApiKey::generate().unwrap();
        let key = sample_key(&raw);

        let document = bson::to_document(&StoredApiKey::from(&key)).unwrap();
        assert!(!document.contains_key("api_key"));
        assert!(!document.to_string().contains(raw.expose()));
        assert_eq!(document.get_str("key_hash").unwrap(), key.key_hash);
    }

    #[test]
    fn stored_key_round_trips() {
        let raw = RawApiKey::generate().unwrap();
        let key = sample_key(&raw);

        let document = bson::to_document(&StoredApiKey::from(&key)).unwrap();
        let permissions = document.get_array("permissions").unwrap();
        assert_eq!(permissions.len(), 2);

        let back: StoredApiKey = bson::from_document(document).unwrap();
        assert_eq!(ApiKeyInDb::from(back), key);
    }

    #[test]
    fn update_document_sets_only_present_fields() {
        let update = ApiKeyUpdate {
            permissions: Some(default_permissions()),
            ..Default::default()
        };
        let document = update_document(&update).unwrap();
        let set = document.get_document("$set").unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get_array("permissions").unwrap(),
            &vec![Bson::String("read".into())]
        );
    }

    #[test]
    fn update_document_replaces_permission_set_wholesale() {
        let update = ApiKeyUpdate {
            name: Some(" renamed ".into()),
            permissions: Some(BTreeSet::from([Permission::Delete])),
            expires_at: Some(now() + Duration::days(1)),
            metadata: None,
        };
        let document = update_document(&update).unwrap();
        let set = document.get_document("$set").unwrap();

        assert_eq!(set.get_str("name").unwrap(), "renamed");
        assert_eq!(
            set.get_array("permissions").unwrap(),
            &vec![Bson::String("delete".into())]
        );
        assert!(set.get_datetime("expires_at").is_ok());
        assert!(!set.contains_key("metadata"));
    }

    #[test]
    fn usable_filter_excludes_revoked_and_expired() {
        let filter = usable_for_wallet(&ADDR.into(), now());
        assert!(filter.get_bool("is_active").unwrap());
        assert_eq!(filter.get_array("$or").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn live_concurrent_inserts_keep_active_names_unique() {
        let Ok(uri) = std::env::var("FUSEVAULT_TEST_MONGO_URI") else {
            return;
        };
        let manager = crate::storage::ConnectionManager::new(crate::config::DatabaseConfig {
            uri,
            db_name: format!("fusevault_test_{}", uuid::Uuid::new_v4().simple()),
            verify_on_connect: true,
        });
        let client = manager.get_client().await.unwrap();
        crate::storage::ensure_indexes(&client).await.unwrap();
        let repo = ApiKeyRepository::new(&client);

        let (raw_a, raw_b) = (RawApiKey::generate().unwrap(), RawApiKey::generate().unwrap());
        let (a, b) = (sample_key(&raw_a), sample_key(&raw_b));
        let (first, second) = tokio::join!(repo.insert(&a), repo.insert(&b));

        let conflicts = [&first, &second]
            .into_iter()
            .filter(|result| matches!(result, Err(DbError::AlreadyExists(_))))
            .count();
        assert_eq!(conflicts, 1, "{first:?} / {second:?}");

        // Renaming onto an active name is a conflict too.
        let mut other = sample_key(&RawApiKey::generate().unwrap());
        other.name = "other".into();
        repo.insert(&other).await.unwrap();
        let rename = ApiKeyUpdate {
            name: Some("deploy".into()),
            ..Default::default()
        };
        assert!(matches!(
            repo.update(&ADDR.into(), "other", &rename).await,
            Err(DbError::AlreadyExists(_))
        ));

        // Once revoked, the name is free again.
        assert!(repo.revoke(&ADDR.into(), "deploy").await.unwrap());
        repo.update(&ADDR.into(), "other", &rename).await.unwrap();

        client.database().drop().await.unwrap();
        manager.close().await;
    }
}
