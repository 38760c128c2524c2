//! Snapshot persistence
//!
//! Three artifacts per write:
//!
//! - `<name>.snapshot.json` — the payload, persisted as its canonical bytes
//!   (the exact bytes the content hash covers, so any on-disk mutation is
//!   detectable)
//! - `<name>.metadata.json` — hash, signature, chain link
//! - `chain.json` — the ordered chain of every generation
//!
//! Writers are serialized by a lock. Every artifact goes through
//! write-to-tmp + rename with a directory fsync; the metadata rename is the
//! commit point, so a crash mid-write leaves the previous generation
//! verifiable.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::Value;

use crate::config::SigningKey;

use super::canonical::canonical_bytes;
use super::chain::{next_entry, ChainEntry};
use super::errors::{SnapshotError, SnapshotResult};
use super::hasher::hash_bytes;
use super::metadata::SnapshotMetadata;
use super::signer::SnapshotSigner;

const CHAIN_FILE: &str = "chain.json";

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Durable, chain-linked snapshot store
pub struct SnapshotStore {
    dir: PathBuf,
    signer: SnapshotSigner,
    write_lock: Mutex<()>,
}

impl SnapshotStore {
    /// Open (or create) the store under `dir` with the process signing key.
    pub fn open(dir: &Path, signing_key: SigningKey) -> SnapshotResult<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            SnapshotError::io(
                format!("Failed to create snapshot directory: {}", dir.display()),
                e,
            )
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            signer: SnapshotSigner::new(signing_key),
            write_lock: Mutex::new(()),
        })
    }

    /// The signer bound to this store (shared with the tamper detector)
    pub fn signer(&self) -> &SnapshotSigner {
        &self.signer
    }

    fn payload_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.snapshot.json", name))
    }

    fn metadata_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.metadata.json", name))
    }

    fn chain_path(&self) -> PathBuf {
        self.dir.join(CHAIN_FILE)
    }

    /// Freeze a payload: canonicalize, hash, sign, chain, persist.
    ///
    /// Returns the metadata of the new generation.
    pub fn write(&self, name: &str, payload: &Value) -> SnapshotResult<SnapshotMetadata> {
        if !is_valid_name(name) {
            return Err(SnapshotError::bad_name(name));
        }

        let _writer = self
            .write_lock
            .lock()
            .map_err(|_| SnapshotError::lock_poisoned())?;

        let bytes = canonical_bytes(payload);
        let content_hash = hash_bytes(&bytes);
        let signature = self.signer.sign(&content_hash);
        let timestamp = Utc::now().timestamp_micros() as f64 / 1_000_000.0;

        let mut chain = self.load_chain()?;
        let entry = next_entry(&chain, name, &content_hash, timestamp);

        let metadata = SnapshotMetadata {
            snapshot_name: name.to_string(),
            content_hash: content_hash.clone(),
            signature,
            prev_hash: entry.prev_hash.clone(),
            sequence: entry.sequence,
            timestamp,
            size_bytes: bytes.len() as u64,
        };

        // Payload first, metadata second (the commit point), chain last.
        self.atomic_write(&self.payload_path(name), &bytes)?;
        let metadata_json = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| SnapshotError::encode(format!("Metadata encode: {}", e)))?;
        self.atomic_write(&self.metadata_path(name), &metadata_json)?;

        chain.push(entry);
        let chain_json = serde_json::to_vec_pretty(&chain)
            .map_err(|e| SnapshotError::encode(format!("Chain encode: {}", e)))?;
        self.atomic_write(&self.chain_path(), &chain_json)?;

        Ok(metadata)
    }

    /// Read a snapshot payload, if present.
    pub fn read(&self, name: &str) -> SnapshotResult<Option<Value>> {
        if !is_valid_name(name) {
            return Err(SnapshotError::bad_name(name));
        }
        match fs::read(self.payload_path(name)) {
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| SnapshotError::encode(format!("Payload decode: {}", e)))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SnapshotError::io(
                format!("Failed to read snapshot '{}'", name),
                e,
            )),
        }
    }

    /// Raw persisted payload bytes (what the content hash covers).
    pub fn read_raw(&self, name: &str) -> SnapshotResult<Option<Vec<u8>>> {
        if !is_valid_name(name) {
            return Err(SnapshotError::bad_name(name));
        }
        match fs::read(self.payload_path(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SnapshotError::io(
                format!("Failed to read snapshot '{}'", name),
                e,
            )),
        }
    }

    /// Read a snapshot's metadata, if present.
    pub fn metadata(&self, name: &str) -> SnapshotResult<Option<SnapshotMetadata>> {
        if !is_valid_name(name) {
            return Err(SnapshotError::bad_name(name));
        }
        match fs::read_to_string(self.metadata_path(name)) {
            Ok(contents) => {
                let metadata = serde_json::from_str(&contents)
                    .map_err(|e| SnapshotError::encode(format!("Metadata decode: {}", e)))?;
                Ok(Some(metadata))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SnapshotError::io(
                format!("Failed to read metadata for '{}'", name),
                e,
            )),
        }
    }

    /// The full chain, oldest first.
    pub fn load_chain(&self) -> SnapshotResult<Vec<ChainEntry>> {
        match fs::read_to_string(self.chain_path()) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| SnapshotError::encode(format!("Chain decode: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(SnapshotError::io("Failed to read chain file", e)),
        }
    }

    /// Snapshot names with a persisted payload, sorted.
    pub fn list(&self) -> SnapshotResult<Vec<String>> {
        let mut names = Vec::new();
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| SnapshotError::io("Failed to list snapshot directory", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| SnapshotError::io("Failed to list snapshot", e))?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if let Some(name) = file_name.strip_suffix(".snapshot.json") {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// tmp + rename + directory fsync
    fn atomic_write(&self, target: &Path, bytes: &[u8]) -> SnapshotResult<()> {
        let tmp = target.with_extension("tmp");

        let mut file = File::create(&tmp).map_err(|e| {
            SnapshotError::io(format!("Failed to create {}", tmp.display()), e)
        })?;
        file.write_all(bytes)
            .map_err(|e| SnapshotError::io(format!("Failed to write {}", tmp.display()), e))?;
        file.sync_all()
            .map_err(|e| SnapshotError::io(format!("Failed to fsync {}", tmp.display()), e))?;

        fs::rename(&tmp, target).map_err(|e| {
            SnapshotError::io(
                format!("Failed to rename {} into place", tmp.display()),
                e,
            )
        })?;

        // fsync the directory so the rename is durable
        if let Ok(dir) = File::open(&self.dir) {
            let _ = dir.sync_all();
        }
        Ok(())
    }
}
