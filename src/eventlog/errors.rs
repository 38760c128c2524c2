//! Event log error types
//!
//! Error codes:
//! - TOWER_EVENT_DUPLICATE_CREATION (ERROR severity)
//! - TOWER_EVENT_INVALID_TRANSITION (ERROR severity)
//! - TOWER_EVENT_UNKNOWN_STATE (ERROR severity)
//! - TOWER_EVENT_ROLE_UNAUTHORIZED (ERROR severity)
//! - TOWER_EVENT_STORAGE (FATAL severity)
//! - TOWER_EVENT_CORRUPTION (FATAL severity)
//!
//! Validation failures leave no side effects; the caller gets a structured
//! reason. Storage failures are fatal to the writer: an appender that cannot
//! persist durably must stop rather than acknowledge.

use std::fmt;
use std::io;

use crate::lifecycle::LifecycleError;

/// Result type for event log operations
pub type EventLogResult<T> = Result<T, EventLogError>;

/// Severity levels for event log errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, process continues
    Error,
    /// The writer must terminate
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Event log error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLogErrorCode {
    /// A second SHIPMENT_CREATED for the same shipment id
    TowerEventDuplicateCreation,
    /// The requested lifecycle edge does not exist
    TowerEventInvalidTransition,
    /// The caller's view of the current state does not match the log
    TowerEventUnknownState,
    /// The acting role may not emit this event
    TowerEventRoleUnauthorized,
    /// Append or fsync failed
    TowerEventStorage,
    /// A persisted line failed to parse or violates ordering
    TowerEventCorruption,
}

impl EventLogErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            EventLogErrorCode::TowerEventDuplicateCreation => "TOWER_EVENT_DUPLICATE_CREATION",
            EventLogErrorCode::TowerEventInvalidTransition => "TOWER_EVENT_INVALID_TRANSITION",
            EventLogErrorCode::TowerEventUnknownState => "TOWER_EVENT_UNKNOWN_STATE",
            EventLogErrorCode::TowerEventRoleUnauthorized => "TOWER_EVENT_ROLE_UNAUTHORIZED",
            EventLogErrorCode::TowerEventStorage => "TOWER_EVENT_STORAGE",
            EventLogErrorCode::TowerEventCorruption => "TOWER_EVENT_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            EventLogErrorCode::TowerEventStorage | EventLogErrorCode::TowerEventCorruption => {
                Severity::Fatal
            }
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for EventLogErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Event log error with full context
#[derive(Debug)]
pub struct EventLogError {
    /// Error code
    code: EventLogErrorCode,
    /// Human-readable message
    message: String,
    /// Underlying IO error if applicable
    source: Option<io::Error>,
}

impl EventLogError {
    /// A second creation event for an existing shipment
    pub fn duplicate_creation(shipment_id: &str) -> Self {
        Self {
            code: EventLogErrorCode::TowerEventDuplicateCreation,
            message: format!("Shipment '{}' already exists", shipment_id),
            source: None,
        }
    }

    /// The caller's `previous_state` does not match the log's view
    pub fn unknown_state(shipment_id: &str, claimed: &str, actual: &str) -> Self {
        Self {
            code: EventLogErrorCode::TowerEventUnknownState,
            message: format!(
                "Shipment '{}': caller claims state {}, log says {}",
                shipment_id, claimed, actual
            ),
            source: None,
        }
    }

    /// Append or fsync failure. Fatal.
    pub fn storage(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: EventLogErrorCode::TowerEventStorage,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Persisted data failed to parse. Fatal.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self {
            code: EventLogErrorCode::TowerEventCorruption,
            message: message.into(),
            source: None,
        }
    }

    /// Get the error code
    pub fn code(&self) -> EventLogErrorCode {
        self.code
    }

    /// Get the message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// True when the writer must shut down
    pub fn is_fatal(&self) -> bool {
        self.code.severity() == Severity::Fatal
    }
}

impl From<LifecycleError> for EventLogError {
    fn from(err: LifecycleError) -> Self {
        let code = match err {
            LifecycleError::InvalidTransition { .. } => {
                EventLogErrorCode::TowerEventInvalidTransition
            }
            LifecycleError::UnknownCurrentState { .. } => EventLogErrorCode::TowerEventUnknownState,
            LifecycleError::RoleUnauthorized { .. } => {
                EventLogErrorCode::TowerEventRoleUnauthorized
            }
        };
        Self {
            code,
            message: err.to_string(),
            source: None,
        }
    }
}

impl fmt::Display for EventLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for EventLogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
