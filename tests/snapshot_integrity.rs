//! Snapshot Integrity Invariant Tests
//!
//! Tests for invariants:
//! - S1: hash(canonical(payload)) == metadata.content_hash
//! - S2: the signature verifies against the content hash
//! - S3: consecutive chain entries link by content hash; first is genesis
//! - S4: tampering ANY byte of a persisted payload is detected as
//!       TAMPERED/CRITICAL
//! - S5: chain verification names the snapshot where the break starts

use std::fs;
use std::sync::Arc;

use controltower::config::SigningKey;
use controltower::integrity::{IntegrityStatus, TamperDetector, TamperSeverity};
use controltower::snapshot::{
    hash_payload, verify_chain, SnapshotStore, GENESIS_HASH,
};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn open_store(tmp: &TempDir) -> Arc<SnapshotStore> {
    Arc::new(
        SnapshotStore::open(
            tmp.path(),
            SigningKey::from_bytes(b"integrity-test-key".to_vec()),
        )
        .unwrap(),
    )
}

fn write_three(store: &SnapshotStore) {
    store
        .write("snapshot_one", &json!({"shipments": 10, "state": "CREATED"}))
        .unwrap();
    store
        .write("snapshot_two", &json!({"corridor": "Gujarat -> Kerala", "risk": 0.42}))
        .unwrap();
    store
        .write("snapshot_three", &json!({"cells": [1, 2, 3]}))
        .unwrap();
}

fn payload_path(tmp: &TempDir, name: &str) -> std::path::PathBuf {
    tmp.path().join(format!("{}.snapshot.json", name))
}

// =============================================================================
// INVARIANT S1/S2: hash and signature verify for honest writes
// =============================================================================

#[test]
fn test_s1_hash_matches_canonical_payload() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    let payload = json!({"b": [1, 2], "a": "x"});
    let metadata = store.write("demo", &payload).unwrap();

    assert_eq!(hash_payload(&payload), metadata.content_hash);
}

#[test]
fn test_s2_signature_verifies() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    let metadata = store.write("demo", &json!({"n": 1})).unwrap();

    assert!(store
        .signer()
        .verify(&metadata.content_hash, &metadata.signature));

    let detector = TamperDetector::new(Arc::clone(&store));
    let report = detector.detect("demo");
    assert_eq!(report.status, IntegrityStatus::Intact);
    assert!(report.violated_rules.is_empty());
    assert_eq!(report.severity, None);
}

// =============================================================================
// INVARIANT S3: chain linkage
// =============================================================================

#[test]
fn test_s3_chain_links_by_content_hash() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    write_three(&store);

    let chain = store.load_chain().unwrap();
    assert_eq!(chain.len(), 3);
    assert_eq!(chain[0].prev_hash, GENESIS_HASH);
    assert_eq!(chain[1].prev_hash, chain[0].content_hash);
    assert_eq!(chain[2].prev_hash, chain[1].content_hash);
    assert_eq!(
        chain.iter().map(|e| e.sequence).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert!(verify_chain(&chain).valid);
}

// =============================================================================
// INVARIANT S4: any byte mutation is TAMPERED/CRITICAL
// =============================================================================

/// Mutate byte 17 of the second payload file; detection must flag exactly
/// that snapshot and chain verification must break there.
#[test]
fn test_s4_byte_17_mutation_detected() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    write_three(&store);

    let path = payload_path(&tmp, "snapshot_two");
    let mut bytes = fs::read(&path).unwrap();
    assert!(bytes.len() > 17);
    bytes[17] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let detector = TamperDetector::new(Arc::clone(&store));

    let report = detector.detect("snapshot_two");
    assert_eq!(report.status, IntegrityStatus::Tampered);
    assert_eq!(report.severity, Some(TamperSeverity::Critical));
    assert_eq!(report.violated_rules, vec!["hash_mismatch".to_string()]);

    // Neighbors stay intact
    assert_eq!(detector.detect("snapshot_one").status, IntegrityStatus::Intact);
    assert_eq!(detector.detect("snapshot_three").status, IntegrityStatus::Intact);
}

/// Every byte offset counts: flip one bit at several positions.
#[test]
fn test_s4_any_offset_detected() {
    for offset in [0usize, 1, 5, 11] {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        store.write("victim", &json!({"k": "value"})).unwrap();

        let path = payload_path(&tmp, "victim");
        let mut bytes = fs::read(&path).unwrap();
        assert!(offset < bytes.len());
        bytes[offset] ^= 0x01;
        fs::write(&path, &bytes).unwrap();

        let detector = TamperDetector::new(Arc::clone(&store));
        assert_eq!(
            detector.detect("victim").status,
            IntegrityStatus::Tampered,
            "offset {} escaped detection",
            offset
        );
    }
}

/// A forged signature is TAMPERED even when the payload is untouched.
#[test]
fn test_s4_signature_forgery_detected() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    let metadata = store.write("victim", &json!({"k": 1})).unwrap();

    // Rewrite metadata with a flipped signature
    let metadata_path = tmp.path().join("victim.metadata.json");
    let mut forged = metadata.clone();
    forged.signature = {
        let mut s = metadata.signature.into_bytes();
        s[0] = if s[0] == b'a' { b'b' } else { b'a' };
        String::from_utf8(s).unwrap()
    };
    fs::write(
        &metadata_path,
        serde_json::to_string_pretty(&forged).unwrap(),
    )
    .unwrap();

    let detector = TamperDetector::new(Arc::clone(&store));
    let report = detector.detect("victim");
    assert_eq!(report.status, IntegrityStatus::Tampered);
    assert_eq!(report.violated_rules, vec!["signature_invalid".to_string()]);
}

// =============================================================================
// Missing artifacts
// =============================================================================

#[test]
fn test_missing_snapshot_is_high_not_critical() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    let detector = TamperDetector::new(Arc::clone(&store));

    let report = detector.detect("never_written");
    assert_eq!(report.status, IntegrityStatus::Missing);
    assert_eq!(report.severity, Some(TamperSeverity::High));
}

#[test]
fn test_missing_metadata_is_error() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    store.write("victim", &json!({"k": 1})).unwrap();
    fs::remove_file(tmp.path().join("victim.metadata.json")).unwrap();

    let detector = TamperDetector::new(Arc::clone(&store));
    let report = detector.detect("victim");
    assert_eq!(report.status, IntegrityStatus::Error);
    assert_eq!(report.violated_rules, vec!["metadata_missing".to_string()]);
}

// =============================================================================
// INVARIANT S5: chain verification locates the break
// =============================================================================

#[test]
fn test_s5_chain_break_located_at_tampered_snapshot() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    write_three(&store);

    // Corrupt snapshot_two's stored content_hash so its link to
    // snapshot_one no longer holds from snapshot_three's perspective
    let metadata_path = tmp.path().join("snapshot_two.metadata.json");
    let mut metadata = store.metadata("snapshot_two").unwrap().unwrap();
    metadata.prev_hash = "f".repeat(64);
    fs::write(
        &metadata_path,
        serde_json::to_string_pretty(&metadata).unwrap(),
    )
    .unwrap();

    let detector = TamperDetector::new(Arc::clone(&store));
    let report =
        detector.verify_chain(&["snapshot_one", "snapshot_two", "snapshot_three"]);
    assert!(!report.chain_valid);
    assert_eq!(report.broken_at.as_deref(), Some("snapshot_two"));
}

#[test]
fn test_s5_intact_chain_reports_valid() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    write_three(&store);

    let detector = TamperDetector::new(Arc::clone(&store));
    let report =
        detector.verify_chain(&["snapshot_one", "snapshot_two", "snapshot_three"]);
    assert!(report.chain_valid);
    assert_eq!(report.broken_at, None);
}

// =============================================================================
// assert_integrity fails closed
// =============================================================================

#[test]
fn test_assert_integrity_raises_on_tamper() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);
    store.write("victim", &json!({"k": 1})).unwrap();

    let path = payload_path(&tmp, "victim");
    let mut bytes = fs::read(&path).unwrap();
    bytes[3] ^= 0x10;
    fs::write(&path, &bytes).unwrap();

    let detector = TamperDetector::new(Arc::clone(&store));
    let err = detector.assert_integrity("victim").unwrap_err();
    assert_eq!(err.status, IntegrityStatus::Tampered);

    // Missing snapshots also fail closed
    assert!(detector.assert_integrity("never_written").is_err());
}
