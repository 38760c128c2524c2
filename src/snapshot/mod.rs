//! Snapshot subsystem
//!
//! Periodically freezes read-model slices into tamper-evident artifacts:
//!
//! 1. serialize the payload canonically (sorted keys, compact, ASCII-safe)
//! 2. SHA-256 the canonical bytes -> `content_hash`
//! 3. HMAC-SHA256 the hash with the process signing key -> `signature`
//! 4. link into the chain (`prev_hash` = predecessor's `content_hash`,
//!    genesis = 64 zeros)
//! 5. persist payload + metadata atomically, chain last
//!
//! The regulator and forensic surfaces consume ONLY these artifacts; they
//! hold no reference to the live log.

mod canonical;
mod chain;
mod errors;
mod hasher;
mod metadata;
mod signer;
mod store;
mod worker;

pub use canonical::{canonical_bytes, canonical_json};
pub use chain::{chain_proof, next_entry, verify_chain, ChainEntry, ChainVerification, GENESIS_HASH};
pub use errors::{SnapshotError, SnapshotErrorCode, SnapshotResult};
pub use hasher::{hash_bytes, hash_payload, verify_payload_hash};
pub use metadata::SnapshotMetadata;
pub use signer::SnapshotSigner;
pub use store::SnapshotStore;
pub use worker::{SnapshotWorker, SNAPSHOT_FAMILIES};
