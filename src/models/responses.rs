//! Response DTOs for the key-value API
//!
//! Defines the structure of outgoing write and delete bodies. Reads return
//! the bare key-value mapping.

use serde::Serialize;

/// Response body for PUT /api/keys
#[derive(Debug, Clone, Serialize)]
pub struct PutResponse {
    /// Success message
    pub message: String,
    /// Number of keys written
    pub stored: usize,
    /// TTL applied to every key, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

impl PutResponse {
    /// Creates a new PutResponse
    pub fn new(stored: usize, expiry: Option<u64>) -> Self {
        Self {
            message: format!("Stored {} key(s)", stored),
            stored,
            expiry,
        }
    }
}

/// Response body for DELETE /api/keys
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// Number of keys deleted
    pub deleted: usize,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(deleted: usize) -> Self {
        Self {
            message: format!("Deleted {} key(s)", deleted),
            deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_response_serialize() {
        let json = serde_json::to_value(PutResponse::new(2, None)).unwrap();
        assert_eq!(json["stored"], 2);
        assert!(json.get("expiry").is_none());

        let json = serde_json::to_value(PutResponse::new(1, Some(30))).unwrap();
        assert_eq!(json["expiry"], 30);
    }

    #[test]
    fn test_delete_response_serialize() {
        let json = serde_json::to_string(&DeleteResponse::new(3)).unwrap();
        assert!(json.contains("\"deleted\":3"));
    }
}
