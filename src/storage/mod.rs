// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # MongoDB Storage Module
//!
//! Persistent storage lives in a single MongoDB database (`MONGO_DB_NAME`).
//!
//! ## Collections
//!
//! ```text
//! assets/         # Asset records (handle only)
//! auth/           # One outstanding sign-in nonce per wallet
//! sessions/       # Wallet sessions (TTL-indexed on expires_at)
//! transactions/   # Asset history (handle only)
//! users/          # Known wallets and last login
//! api_keys/       # Hashed API keys (raw keys are never stored)
//! ```
//!
//! ## Important Notes
//!
//! - [`ConnectionManager`] is the only place a client is built
//! - Repositories borrow a [`DatabaseClient`] and convert between BSON
//!   documents and the chrono-based API models
//! - Timestamps are stored as BSON dates (millisecond precision)

pub mod connection;
pub mod error;
pub mod indexes;
pub mod repository;

pub use connection::{
    ConnectionManager, DatabaseClient, API_KEYS_COLLECTION, ASSETS_COLLECTION, AUTH_COLLECTION,
    SESSIONS_COLLECTION, TRANSACTIONS_COLLECTION, USERS_COLLECTION,
};
pub use error::{DbError, DbResult};
pub use indexes::ensure_indexes;
pub use repository::{
    ApiKeyRepository, NonceRepository, SessionRepository, StoredApiKey, StoredNonce,
    StoredSession, StoredUser, UserRepository,
};
