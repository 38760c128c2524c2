//! Snapshot engine error types
//!
//! Error codes:
//! - TOWER_SNAPSHOT_IO (ERROR severity)
//! - TOWER_SNAPSHOT_ENCODE (ERROR severity)
//! - TOWER_SNAPSHOT_NAME (ERROR severity)
//! - TOWER_SNAPSHOT_LOCK (ERROR severity)
//!
//! Snapshot failures never terminate the process; the previous snapshot
//! generation stays visible and the next cadence retries.

use std::fmt;
use std::io;

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Snapshot error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotErrorCode {
    /// Filesystem failure while persisting or loading
    TowerSnapshotIo,
    /// Payload or metadata failed to encode/decode
    TowerSnapshotEncode,
    /// Snapshot name contains path-unsafe characters
    TowerSnapshotName,
    /// Writer lock poisoned
    TowerSnapshotLock,
}

impl SnapshotErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SnapshotErrorCode::TowerSnapshotIo => "TOWER_SNAPSHOT_IO",
            SnapshotErrorCode::TowerSnapshotEncode => "TOWER_SNAPSHOT_ENCODE",
            SnapshotErrorCode::TowerSnapshotName => "TOWER_SNAPSHOT_NAME",
            SnapshotErrorCode::TowerSnapshotLock => "TOWER_SNAPSHOT_LOCK",
        }
    }
}

impl fmt::Display for SnapshotErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Snapshot error with context
#[derive(Debug)]
pub struct SnapshotError {
    code: SnapshotErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl SnapshotError {
    /// I/O failure
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: SnapshotErrorCode::TowerSnapshotIo,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Encode/decode failure
    pub fn encode(message: impl Into<String>) -> Self {
        Self {
            code: SnapshotErrorCode::TowerSnapshotEncode,
            message: message.into(),
            source: None,
        }
    }

    /// Rejected snapshot name
    pub fn bad_name(name: &str) -> Self {
        Self {
            code: SnapshotErrorCode::TowerSnapshotName,
            message: format!("Snapshot name '{}' must match [A-Za-z0-9_-]+", name),
            source: None,
        }
    }

    /// Poisoned writer lock
    pub fn lock_poisoned() -> Self {
        Self {
            code: SnapshotErrorCode::TowerSnapshotLock,
            message: "Snapshot writer lock poisoned".to_string(),
            source: None,
        }
    }

    /// Get the error code
    pub fn code(&self) -> SnapshotErrorCode {
        self.code
    }

    /// Get the message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
