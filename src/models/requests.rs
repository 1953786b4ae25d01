//! Request DTOs for the key-value API
//!
//! Query parameters and the write payload.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{KvError, Result};
use crate::kv::KeyFilter;

/// Query parameters for reads and presence checks
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeysQuery {
    /// Regex applied to candidate key names
    #[serde(default)]
    pub filter: Option<String>,
}

impl KeysQuery {
    /// Compiles the filter, if one was given.
    pub fn key_filter(&self) -> Result<Option<KeyFilter>> {
        self.filter.as_deref().map(KeyFilter::parse).transpose()
    }
}

/// Query parameters for writes (PUT /api/keys)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PutQuery {
    /// TTL in seconds, applied to every key in the batch
    #[serde(default)]
    pub expiry: Option<String>,
}

impl PutQuery {
    /// Parses the TTL. An empty parameter means no TTL.
    pub fn ttl_secs(&self) -> Result<Option<u64>> {
        match self.expiry.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Ok(Some(secs)),
                _ => Err(KvError::InvalidExpiry(format!(
                    "'{}' is not a positive number of seconds",
                    raw
                ))),
            },
        }
    }
}

/// Parses a write payload into key-value pairs.
///
/// The body must be a JSON object. String values are stored as-is; numbers
/// and booleans are stored as their JSON text. Anything else is rejected
/// before a single key is written.
pub fn parse_entries(body: &[u8]) -> Result<BTreeMap<String, String>> {
    let parsed: Value = serde_json::from_slice(body)
        .map_err(|e| KvError::BadPayload(format!("payload is not valid JSON: {}", e)))?;

    let Value::Object(object) = parsed else {
        return Err(KvError::BadPayload(
            "payload should be a JSON object".to_string(),
        ));
    };

    object
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => Ok((key, s)),
            Value::Number(n) => Ok((key, n.to_string())),
            Value::Bool(b) => Ok((key, b.to_string())),
            _ => Err(KvError::BadPayload(format!(
                "value for '{}' must be a string, number or boolean",
                key
            ))),
        })
        .collect()
}
