// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hash-based change detection.
//!
//! The SyncState controller compares the hash of the aggregated configuration
//! with `status.configHash` and skips the Cloudflare call when they match. The
//! hash is computed over canonical JSON (object keys sorted at every level), so
//! equal configurations hash equal regardless of how their sources ordered keys.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// SHA-256 hex digest of the canonical JSON form of `value`.
#[must_use]
pub fn config_hash(value: &Value) -> String {
    let canonical = canonicalize(value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash any serializable value. Serialization failures hash as `null`.
#[must_use]
pub fn hash_of<T: Serialize>(value: &T) -> String {
    config_hash(&serde_json::to_value(value).unwrap_or(Value::Null))
}

/// Rebuild `value` with the keys of every object in ascending order.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key.clone(), canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod hash_tests;
