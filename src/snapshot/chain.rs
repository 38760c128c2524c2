//! The snapshot hash chain
//!
//! Every snapshot generation links to its predecessor by content hash. The
//! first entry references the genesis value (64 ASCII zeros). A verifier
//! can walk the chain end-to-end and pin down the first broken link.

use serde::{Deserialize, Serialize};

/// The `prev_hash` of the first chain entry: 64 ASCII zeros
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// One link in the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEntry {
    /// Snapshot family name
    pub snapshot_name: String,
    /// Content hash of this generation (64 hex)
    pub content_hash: String,
    /// Content hash of the previous entry, or genesis (64 hex)
    pub prev_hash: String,
    /// Creation time, seconds since epoch
    pub timestamp: f64,
    /// Position in the chain, monotonic from 0
    pub sequence: u64,
}

/// Outcome of a chain walk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainVerification {
    /// True when every link holds
    pub valid: bool,
    /// Number of entries examined
    pub length: usize,
    /// Index of the first broken link
    pub broken_at: Option<usize>,
    /// What broke, when something did
    pub error: Option<String>,
}

impl ChainVerification {
    fn ok(length: usize) -> Self {
        Self {
            valid: true,
            length,
            broken_at: None,
            error: None,
        }
    }

    fn broken(length: usize, at: usize, error: String) -> Self {
        Self {
            valid: false,
            length,
            broken_at: Some(at),
            error: Some(error),
        }
    }
}

/// Build the next entry for a chain.
///
/// An empty chain produces sequence 0 linked to genesis; otherwise the new
/// entry references the head's content hash.
pub fn next_entry(
    chain: &[ChainEntry],
    snapshot_name: &str,
    content_hash: &str,
    timestamp: f64,
) -> ChainEntry {
    let (prev_hash, sequence) = match chain.last() {
        Some(head) => (head.content_hash.clone(), head.sequence + 1),
        None => (GENESIS_HASH.to_string(), 0),
    };
    ChainEntry {
        snapshot_name: snapshot_name.to_string(),
        content_hash: content_hash.to_string(),
        prev_hash,
        timestamp,
        sequence,
    }
}

/// Walk an ordered chain and verify every link.
///
/// Checks: the first entry references genesis; every later entry references
/// its predecessor's content hash; sequence numbers are consecutive.
pub fn verify_chain(chain: &[ChainEntry]) -> ChainVerification {
    if chain.is_empty() {
        return ChainVerification::ok(0);
    }

    if chain[0].prev_hash != GENESIS_HASH {
        return ChainVerification::broken(
            chain.len(),
            0,
            format!(
                "First entry must reference genesis, got {}",
                chain[0].prev_hash
            ),
        );
    }

    for i in 1..chain.len() {
        let previous = &chain[i - 1];
        let current = &chain[i];

        if current.prev_hash != previous.content_hash {
            return ChainVerification::broken(
                chain.len(),
                i,
                format!(
                    "Link break at {}: expected prev_hash {}, got {}",
                    current.snapshot_name, previous.content_hash, current.prev_hash
                ),
            );
        }
        if current.sequence != previous.sequence + 1 {
            return ChainVerification::broken(
                chain.len(),
                i,
                format!(
                    "Sequence break at {}: {} after {}",
                    current.snapshot_name, current.sequence, previous.sequence
                ),
            );
        }
    }

    ChainVerification::ok(chain.len())
}

/// Proof path from genesis to the entry carrying `content_hash`.
///
/// `None` when the hash is not in the chain.
pub fn chain_proof<'a>(chain: &'a [ChainEntry], content_hash: &str) -> Option<&'a [ChainEntry]> {
    let index = chain
        .iter()
        .position(|entry| entry.content_hash == content_hash)?;
    Some(&chain[..=index])
}
