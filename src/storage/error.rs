// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Database error type.

use mongodb::error::{ErrorKind, WriteFailure};

/// Server code for a unique-index violation.
const DUPLICATE_KEY: i32 = 11000;

/// Errors raised by the connection manager and the repositories.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The connection string could not be parsed into client options.
    #[error("invalid MongoDB connection string: {0}")]
    InvalidUri(#[source] mongodb::error::Error),

    /// The server did not answer the connection check.
    #[error("could not reach MongoDB: {0}")]
    Unreachable(#[source] mongodb::error::Error),

    /// Any other driver failure.
    #[error("MongoDB error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// A stored document could not be decoded.
    #[error("document decode error: {0}")]
    Decode(#[from] bson::de::Error),

    /// A value could not be encoded as BSON.
    #[error("document encode error: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Report a unique-index violation as `AlreadyExists(what)`.
    pub fn from_write(e: mongodb::error::Error, what: impl FnOnce() -> String) -> Self {
        if is_duplicate_key(&e.kind) {
            DbError::AlreadyExists(what())
        } else {
            DbError::Driver(e)
        }
    }
}

fn is_duplicate_key(kind: &ErrorKind) -> bool {
    match kind {
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == DUPLICATE_KEY,
        ErrorKind::Command(command) => command.code == DUPLICATE_KEY,
        _ => false,
    }
}
