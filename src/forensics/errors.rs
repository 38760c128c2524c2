//! Forensic error types
//!
//! Integrity failures are never recovered silently: replay and export
//! surface the violation and stop.

use thiserror::Error;

use crate::integrity::IntegrityStatus;

/// Result type for forensic operations
pub type ForensicResult<T> = Result<T, ForensicError>;

/// Forensic errors
#[derive(Debug, Error)]
pub enum ForensicError {
    /// Replay refused: the snapshot is not INTACT
    #[error("Cannot replay snapshot '{snapshot_name}': integrity status {status}")]
    IntegrityFailure {
        /// The failing snapshot
        snapshot_name: String,
        /// The non-INTACT status
        status: IntegrityStatus,
    },

    /// The snapshot does not exist
    #[error("Snapshot not found: {0}")]
    SnapshotMissing(String),

    /// The requested replay time predates the snapshot
    #[error(
        "Requested timestamp {requested} is before snapshot timestamp {snapshot_timestamp}"
    )]
    TimestampBeforeSnapshot {
        /// Requested replay time (epoch seconds)
        requested: f64,
        /// The snapshot's creation time (epoch seconds)
        snapshot_timestamp: f64,
    },

    /// Filesystem failure; partial files are never committed
    #[error("Forensic I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Encode/decode failure
    #[error("Forensic encode failure: {0}")]
    Encode(#[from] serde_json::Error),

    /// Underlying snapshot store failure
    #[error("Snapshot store failure: {0}")]
    Store(#[from] crate::snapshot::SnapshotError),
}
