//! Tamper detection over persisted snapshots
//!
//! Fail loudly: a mismatch is reported, never repaired. Check order:
//!
//! 1. snapshot payload exists
//! 2. metadata exists and parses
//! 3. recomputed content hash matches the stored one
//! 4. HMAC signature verifies (constant-time)
//!
//! Hash and signature mismatches are CRITICAL; missing artifacts are HIGH.
//! `assert_integrity` turns any non-INTACT result into a dedicated error —
//! silent recovery is forbidden.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::snapshot::{hash_bytes, SnapshotMetadata, SnapshotStore, GENESIS_HASH};

/// Outcome of a tamper check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrityStatus {
    /// All checks passed
    Intact,
    /// Hash or signature mismatch
    Tampered,
    /// Payload file absent
    Missing,
    /// Metadata absent, unparseable, or the store failed
    Error,
}

impl IntegrityStatus {
    /// Stable string token
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrityStatus::Intact => "INTACT",
            IntegrityStatus::Tampered => "TAMPERED",
            IntegrityStatus::Missing => "MISSING",
            IntegrityStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for IntegrityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an integrity finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TamperSeverity {
    /// Cryptographic mismatch
    Critical,
    /// Artifact missing
    High,
}

/// Full tamper-check report for one snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TamperReport {
    /// The snapshot examined
    pub snapshot_name: String,
    /// Overall status
    pub status: IntegrityStatus,
    /// Which rules were violated, in check order
    pub violated_rules: Vec<String>,
    /// Severity of the worst finding; absent when intact
    pub severity: Option<TamperSeverity>,
    /// Specific findings (expected/actual hashes, error text)
    pub details: BTreeMap<String, Value>,
}

impl TamperReport {
    fn intact(snapshot_name: &str, content_hash: &str) -> Self {
        let mut details = BTreeMap::new();
        details.insert("hash".to_string(), Value::String(content_hash.to_string()));
        details.insert("signature_valid".to_string(), Value::Bool(true));
        Self {
            snapshot_name: snapshot_name.to_string(),
            status: IntegrityStatus::Intact,
            violated_rules: Vec::new(),
            severity: None,
            details,
        }
    }

    fn finding(
        snapshot_name: &str,
        status: IntegrityStatus,
        rule: &str,
        severity: TamperSeverity,
        details: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            snapshot_name: snapshot_name.to_string(),
            status,
            violated_rules: vec![rule.to_string()],
            severity: Some(severity),
            details,
        }
    }
}

/// Chain verification over an explicit, ordered list of snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainLinkReport {
    /// True when every link holds
    pub chain_valid: bool,
    /// Name of the snapshot where the chain first breaks
    pub broken_at: Option<String>,
    /// Specific findings
    pub details: BTreeMap<String, Value>,
}

/// Raised by `assert_integrity`; never recovered silently
#[derive(Debug, Error)]
#[error("Snapshot '{snapshot_name}' failed integrity: {status} ({rules})", rules = .violated_rules.join(", "))]
pub struct TamperDetected {
    /// The failing snapshot
    pub snapshot_name: String,
    /// The non-INTACT status
    pub status: IntegrityStatus,
    /// The violated rules
    pub violated_rules: Vec<String>,
}

/// Tamper detector bound to a snapshot store
pub struct TamperDetector {
    store: Arc<SnapshotStore>,
}

impl TamperDetector {
    /// Bind to a store
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    /// Run the full check ladder for one snapshot.
    ///
    /// Never returns an error: store failures surface as `ERROR` status so
    /// the caller always gets a report.
    pub fn detect(&self, snapshot_name: &str) -> TamperReport {
        let mut details = BTreeMap::new();

        // 1. Payload exists
        let raw = match self.store.read_raw(snapshot_name) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                details.insert(
                    "error".to_string(),
                    Value::String(format!("Snapshot '{}' not found", snapshot_name)),
                );
                return TamperReport::finding(
                    snapshot_name,
                    IntegrityStatus::Missing,
                    "snapshot_not_found",
                    TamperSeverity::High,
                    details,
                );
            }
            Err(e) => {
                details.insert("error".to_string(), Value::String(e.to_string()));
                return TamperReport::finding(
                    snapshot_name,
                    IntegrityStatus::Error,
                    "store_failure",
                    TamperSeverity::High,
                    details,
                );
            }
        };

        // 2. Metadata exists and parses
        let metadata = match self.store.metadata(snapshot_name) {
            Ok(Some(metadata)) => metadata,
            Ok(None) => {
                details.insert(
                    "error".to_string(),
                    Value::String("Snapshot metadata not found".to_string()),
                );
                return TamperReport::finding(
                    snapshot_name,
                    IntegrityStatus::Error,
                    "metadata_missing",
                    TamperSeverity::High,
                    details,
                );
            }
            Err(e) => {
                details.insert("error".to_string(), Value::String(e.to_string()));
                return TamperReport::finding(
                    snapshot_name,
                    IntegrityStatus::Error,
                    "metadata_invalid",
                    TamperSeverity::High,
                    details,
                );
            }
        };
        if !metadata.is_well_formed() {
            details.insert(
                "error".to_string(),
                Value::String("Metadata fields are malformed".to_string()),
            );
            return TamperReport::finding(
                snapshot_name,
                IntegrityStatus::Error,
                "metadata_invalid",
                TamperSeverity::High,
                details,
            );
        }

        // 3. Recompute the content hash over the persisted bytes
        let actual_hash = hash_bytes(&raw);
        if actual_hash != metadata.content_hash {
            details.insert(
                "expected_hash".to_string(),
                Value::String(metadata.content_hash.clone()),
            );
            details.insert("actual_hash".to_string(), Value::String(actual_hash));
            return TamperReport::finding(
                snapshot_name,
                IntegrityStatus::Tampered,
                "hash_mismatch",
                TamperSeverity::Critical,
                details,
            );
        }

        // 4. Signature over the hash, constant-time
        if !self
            .store
            .signer()
            .verify(&metadata.content_hash, &metadata.signature)
        {
            details.insert(
                "signature".to_string(),
                Value::String(metadata.signature.clone()),
            );
            return TamperReport::finding(
                snapshot_name,
                IntegrityStatus::Tampered,
                "signature_invalid",
                TamperSeverity::Critical,
                details,
            );
        }

        TamperReport::intact(snapshot_name, &metadata.content_hash)
    }

    /// Verify chain linkage across an ordered list of snapshot names.
    ///
    /// Each snapshot's `prev_hash` must equal its predecessor's
    /// `content_hash`; a list starting at sequence 0 must reference genesis.
    pub fn verify_chain(&self, snapshot_names: &[&str]) -> ChainLinkReport {
        let mut details = BTreeMap::new();

        if snapshot_names.is_empty() {
            details.insert(
                "error".to_string(),
                Value::String("No snapshots to verify".to_string()),
            );
            return ChainLinkReport {
                chain_valid: false,
                broken_at: None,
                details,
            };
        }

        let mut loaded: Vec<SnapshotMetadata> = Vec::with_capacity(snapshot_names.len());
        for name in snapshot_names {
            match self.store.metadata(name) {
                Ok(Some(metadata)) => loaded.push(metadata),
                _ => {
                    details.insert(
                        "error".to_string(),
                        Value::String(format!("Missing metadata for '{}'", name)),
                    );
                    return ChainLinkReport {
                        chain_valid: false,
                        broken_at: Some(name.to_string()),
                        details,
                    };
                }
            }
        }

        if loaded[0].sequence == 0 && loaded[0].prev_hash != GENESIS_HASH {
            details.insert(
                "error".to_string(),
                Value::String("First snapshot does not reference genesis".to_string()),
            );
            return ChainLinkReport {
                chain_valid: false,
                broken_at: Some(loaded[0].snapshot_name.clone()),
                details,
            };
        }

        for i in 1..loaded.len() {
            let previous = &loaded[i - 1];
            let current = &loaded[i];
            if current.prev_hash != previous.content_hash {
                details.insert(
                    "expected_prev_hash".to_string(),
                    Value::String(previous.content_hash.clone()),
                );
                details.insert(
                    "actual_prev_hash".to_string(),
                    Value::String(current.prev_hash.clone()),
                );
                return ChainLinkReport {
                    chain_valid: false,
                    broken_at: Some(current.snapshot_name.clone()),
                    details,
                };
            }
        }

        details.insert(
            "verified_count".to_string(),
            Value::Number(loaded.len().into()),
        );
        ChainLinkReport {
            chain_valid: true,
            broken_at: None,
            details,
        }
    }

    /// Assert a snapshot is intact.
    ///
    /// # Errors
    ///
    /// Returns `TamperDetected` on ANY non-INTACT status; missing and
    /// unverifiable snapshots fail closed.
    pub fn assert_integrity(&self, snapshot_name: &str) -> Result<(), TamperDetected> {
        let report = self.detect(snapshot_name);
        if report.status == IntegrityStatus::Intact {
            Ok(())
        } else {
            Err(TamperDetected {
                snapshot_name: snapshot_name.to_string(),
                status: report.status,
                violated_rules: report.violated_rules,
            })
        }
    }
}
