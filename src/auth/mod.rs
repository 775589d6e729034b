// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Wallet sign-in, sessions, and API keys for the FuseVault API.
//!
//! ## Auth Flow
//!
//! 1. Frontend requests `GET /v1/auth/nonce/{wallet_address}`
//! 2. Wallet `personal_sign`s `I am signing my one-time nonce: <nonce>`
//! 3. `POST /v1/auth/login` recovers the signer, consumes the nonce, and
//!    sets the `session_id` cookie
//! 4. Later requests carry either:
//!    - the `session_id` cookie (full access), or
//!    - an `X-API-Key` header (the key's permissions only)
//!
//! ## Security
//!
//! - A nonce is deleted on successful sign-in and cannot be replayed
//! - Session usability is checked against `expires_at` on every request
//! - API keys are stored as HMAC-SHA256 hashes; the raw key is shown once

pub mod api_keys;
pub mod error;
pub mod extractor;
pub mod permissions;
pub mod signature;

pub use api_keys::{ApiKeyHasher, RawApiKey};
pub use error::AuthError;
pub use extractor::{AuthMethod, Caller, SessionAuth};
pub use permissions::Permission;
