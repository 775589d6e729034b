// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # External Field Naming
//!
//! Some responses are consumed by a frontend that expects camelCase keys,
//! while the Rust models keep snake_case. Instead of annotating each field,
//! a type lists its renames once in a [`FieldAliases`] table and is wrapped
//! in [`Wire`] at the HTTP boundary:
//!
//! ```rust,ignore
//! Json(Wire(session_response)) // {"sessionId": ..., "walletAddress": ...}
//! ```
//!
//! The table is applied in both directions, so a value serialized through
//! `Wire` parses back to the same internal fields.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use utoipa::openapi::{schema::Schema, RefOr};

/// Bidirectional table of `(internal, external)` field names.
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    pairs: &'static [(&'static str, &'static str)],
}

impl FieldAliases {
    pub const fn new(pairs: &'static [(&'static str, &'static str)]) -> Self {
        Self { pairs }
    }

    /// External name for an internal field, if the table renames it.
    pub fn external_name(&self, internal: &str) -> Option<&'static str> {
        self.pairs
            .iter()
            .find(|(i, _)| *i == internal)
            .map(|(_, e)| *e)
    }

    /// Internal name for an external field, if the table renames it.
    pub fn internal_name(&self, external: &str) -> Option<&'static str> {
        self.pairs
            .iter()
            .find(|(_, e)| *e == external)
            .map(|(i, _)| *i)
    }

    /// Rename internal keys to their external form. Unlisted keys pass through.
    pub fn to_external(&self, object: Map<String, Value>) -> Map<String, Value> {
        object
            .into_iter()
            .map(|(key, value)| match self.external_name(&key) {
                Some(external) => (external.to_string(), value),
                None => (key, value),
            })
            .collect()
    }

    /// Rename external keys to their internal form. Unlisted keys pass through.
    pub fn to_internal(&self, object: Map<String, Value>) -> Map<String, Value> {
        object
            .into_iter()
            .map(|(key, value)| match self.internal_name(&key) {
                Some(internal) => (internal.to_string(), value),
                None => (key, value),
            })
            .collect()
    }

    /// Rename the properties of a generated object schema so the published
    /// contract matches what [`Wire`] sends.
    pub fn rename_schema(&self, schema: &mut RefOr<Schema>) {
        let RefOr::T(Schema::Object(object)) = schema else {
            return;
        };
        for (internal, external) in self.pairs {
            if let Some(property) = object.properties.remove(*internal) {
                object.properties.insert(external.to_string(), property);
            }
            for name in object.required.iter_mut() {
                if name.as_str() == *internal {
                    *name = external.to_string();
                }
            }
        }
    }
}

/// Types with an external naming convention.
pub trait ExternalNames {
    const ALIASES: FieldAliases;
}

/// Serialize `value` with external field names.
pub fn to_external_value<T>(value: &T) -> Result<Value, serde_json::Error>
where
    T: Serialize + ExternalNames,
{
    match serde_json::to_value(value)? {
        Value::Object(object) => Ok(Value::Object(T::ALIASES.to_external(object))),
        other => Ok(other),
    }
}

/// Parse a value that uses external field names.
pub fn from_external_value<T>(value: Value) -> Result<T, serde_json::Error>
where
    T: DeserializeOwned + ExternalNames,
{
    match value {
        Value::Object(object) => {
            if let Some(key) = object
                .keys()
                .find(|key| T::ALIASES.external_name(key).is_some())
            {
                return Err(serde::de::Error::custom(format!(
                    "unexpected field `{key}`, expected `{}`",
                    T::ALIASES.external_name(key).unwrap_or_default()
                )));
            }
            serde_json::from_value(Value::Object(T::ALIASES.to_internal(object)))
        }
        other => serde_json::from_value(other),
    }
}

/// Wrapper that (de)serializes `T` using its external field names.
#[derive(Debug, Clone, PartialEq)]
pub struct Wire<T>(pub T);

impl<T> Serialize for Wire<T>
where
    T: Serialize + ExternalNames,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        to_external_value(&self.0)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Wire<T>
where
    T: DeserializeOwned + ExternalNames,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        from_external_value(value)
            .map(Wire)
            .map_err(serde::de::Error::custom)
    }
}
