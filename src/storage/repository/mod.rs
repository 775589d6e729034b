// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the MongoDB collections.
//!
//! Each repository borrows the shared [`DatabaseClient`](super::DatabaseClient)
//! and owns the BSON shape of one collection.

pub mod api_keys;
pub mod nonces;
pub mod sessions;
pub mod users;

pub use api_keys::{ApiKeyRepository, StoredApiKey};
pub use nonces::{NonceRepository, StoredNonce};
pub use sessions::{SessionRepository, StoredSession};
pub use users::{StoredUser, UserRepository};
