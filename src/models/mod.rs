// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! # API Data Models
//!
//! Request and response payloads. Field names are snake_case on the wire.
//! Request types default every field, so a missing field decodes as empty and
//! is rejected by the handler's own checks rather than by the decoder.
//!
//! - [`auth`]: staff lifecycle, identity-service payloads, reset tokens
//! - [`rbac`]: roles, actions, resources, permission bindings
//! - [`offices`]: branch and unit lookups

pub mod auth;
pub mod offices;
pub mod rbac;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode JSON produced outside this crate, treating `null` members as absent.
///
/// Paired with `#[serde(default)]` on the target type, a `null` string or list
/// becomes empty instead of failing the whole payload.
pub fn from_lenient_value<T: DeserializeOwned>(value: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(strip_nulls(value))
}

pub fn from_lenient_str<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    from_lenient_value(serde_json::from_str(raw)?)
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}
