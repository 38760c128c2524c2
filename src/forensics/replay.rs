//! Forensic snapshot replay
//!
//! Snapshot-driven only: this engine holds no reference to the live event
//! log or read models. Integrity is verified before any content is
//! returned; a non-INTACT snapshot refuses to replay.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::integrity::{IntegrityStatus, TamperDetector};
use crate::snapshot::{SnapshotMetadata, SnapshotStore};

use super::errors::{ForensicError, ForensicResult};

/// The reconstructed state of one snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Snapshot name
    pub snapshot_name: String,
    /// Snapshot creation time (epoch seconds)
    pub timestamp: f64,
    /// The verified payload
    pub content: Value,
    /// Verification metadata
    pub metadata: SnapshotMetadata,
    /// Always INTACT for a returned result
    pub integrity_status: IntegrityStatus,
    /// The requested replay time, when one was given
    pub replay_timestamp: Option<f64>,
}

/// Snapshot-only replay engine
pub struct ReplayEngine {
    store: Arc<SnapshotStore>,
    detector: TamperDetector,
}

impl ReplayEngine {
    /// Bind to a snapshot store.
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        let detector = TamperDetector::new(Arc::clone(&store));
        Self { store, detector }
    }

    /// The detector this engine verifies with.
    pub fn detector(&self) -> &TamperDetector {
        &self.detector
    }

    /// Replay a snapshot's state, optionally "as of" a later timestamp.
    ///
    /// # Errors
    ///
    /// - `IntegrityFailure` on any non-INTACT status (checked first)
    /// - `TimestampBeforeSnapshot` when `at_timestamp` predates the snapshot
    pub fn replay(
        &self,
        snapshot_name: &str,
        at_timestamp: Option<f64>,
    ) -> ForensicResult<ReplayResult> {
        // Integrity gate before anything else
        let report = self.detector.detect(snapshot_name);
        if report.status != IntegrityStatus::Intact {
            return Err(ForensicError::IntegrityFailure {
                snapshot_name: snapshot_name.to_string(),
                status: report.status,
            });
        }

        let content = self
            .store
            .read(snapshot_name)?
            .ok_or_else(|| ForensicError::SnapshotMissing(snapshot_name.to_string()))?;
        let metadata = self
            .store
            .metadata(snapshot_name)?
            .ok_or_else(|| ForensicError::SnapshotMissing(snapshot_name.to_string()))?;

        if let Some(requested) = at_timestamp {
            if requested < metadata.timestamp {
                return Err(ForensicError::TimestampBeforeSnapshot {
                    requested,
                    snapshot_timestamp: metadata.timestamp,
                });
            }
        }

        Ok(ReplayResult {
            snapshot_name: snapshot_name.to_string(),
            timestamp: metadata.timestamp,
            content,
            metadata,
            integrity_status: IntegrityStatus::Intact,
            replay_timestamp: at_timestamp,
        })
    }

    /// Replay several snapshots as of one point in time.
    ///
    /// Snapshots that fail to replay map to `None`; the sweep itself never
    /// aborts.
    pub fn replay_at(
        &self,
        snapshot_names: &[&str],
        at_timestamp: f64,
    ) -> Vec<(String, Option<ReplayResult>)> {
        snapshot_names
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    self.replay(name, Some(at_timestamp)).ok(),
                )
            })
            .collect()
    }
}
