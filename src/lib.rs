// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! FuseVault Server - Wallet-authenticated vault backend
//!
//! This crate provides the MongoDB persistence layer and the wallet
//! authentication surface (nonce challenge, EIP-191 signatures, sessions,
//! API keys) of the FuseVault API.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Wallet sign-in, sessions, and API keys
//! - `config` - Environment-driven configuration
//! - `storage` - MongoDB connection manager and repositories
//! - `wire` - External field naming for client-facing payloads

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod wire;
