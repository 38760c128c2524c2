//! Snapshot metadata artifacts
//!
//! Immutable once written; persisted beside the payload but independently,
//! so either artifact can be verified against the other. Field layout:
//!
//! ```json
//! {
//!   "snapshot_name": "corridor_sla",
//!   "content_hash": "<64 hex>",
//!   "signature": "<64 hex>",
//!   "prev_hash": "<64 hex>",
//!   "sequence": 7,
//!   "timestamp": 1772452800.25,
//!   "size_bytes": 18432
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Immutable metadata for one snapshot generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Snapshot family name
    pub snapshot_name: String,

    /// SHA-256 of the canonical payload bytes (64 hex)
    pub content_hash: String,

    /// HMAC-SHA256 of `content_hash` (64 hex)
    pub signature: String,

    /// Previous snapshot's `content_hash`, or genesis for the first (64 hex)
    pub prev_hash: String,

    /// Position in the chain, monotonic from 0
    pub sequence: u64,

    /// Creation time, seconds since epoch
    pub timestamp: f64,

    /// Size of the persisted payload in bytes
    pub size_bytes: u64,
}

impl SnapshotMetadata {
    /// Basic well-formedness: hex field lengths and a sane timestamp.
    ///
    /// This is a shape check only; cryptographic verification lives in
    /// `integrity`.
    pub fn is_well_formed(&self) -> bool {
        fn is_hex64(s: &str) -> bool {
            s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
        }
        is_hex64(&self.content_hash)
            && is_hex64(&self.signature)
            && is_hex64(&self.prev_hash)
            && self.timestamp > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> SnapshotMetadata {
        SnapshotMetadata {
            snapshot_name: "shipment_index".to_string(),
            content_hash: "a".repeat(64),
            signature: "b".repeat(64),
            prev_hash: "0".repeat(64),
            sequence: 0,
            timestamp: 1_772_452_800.0,
            size_bytes: 128,
        }
    }

    #[test]
    fn test_well_formed() {
        assert!(metadata().is_well_formed());
    }

    #[test]
    fn test_short_hash_rejected() {
        let mut m = metadata();
        m.content_hash = "abc".to_string();
        assert!(!m.is_well_formed());
    }

    #[test]
    fn test_non_hex_signature_rejected() {
        let mut m = metadata();
        m.signature = "z".repeat(64);
        assert!(!m.is_well_formed());
    }

    #[test]
    fn test_json_round_trip() {
        let m = metadata();
        let json = serde_json::to_string(&m).unwrap();
        let back: SnapshotMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
