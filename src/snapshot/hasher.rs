//! Snapshot content hashing
//!
//! SHA-256 over the canonical byte form. Deterministic: the same logical
//! payload always hashes to the same 64-hex digest.

use serde_json::Value;
use sha2::{Digest, Sha256};

use super::canonical::canonical_bytes;

/// SHA-256 of raw bytes, lowercase hex
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// SHA-256 of a payload's canonical form, lowercase hex
pub fn hash_payload(payload: &Value) -> String {
    hash_bytes(&canonical_bytes(payload))
}

/// True when `payload` canonicalizes to `expected_hash`
pub fn verify_payload_hash(payload: &Value, expected_hash: &str) -> bool {
    hash_payload(payload) == expected_hash
}
