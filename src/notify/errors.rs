//! Notification error types

use thiserror::Error;
use uuid::Uuid;

/// Result type for notification operations
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Notification errors
///
/// None of these may propagate into the emitter: the dispatcher catches and
/// logs them at its boundary.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Filesystem failure
    #[error("Notification store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Encode/decode failure
    #[error("Notification is not valid JSON: {0}")]
    Encode(#[from] serde_json::Error),

    /// Template name not in the registry
    #[error("Template '{0}' not found in registry")]
    TemplateUnknown(String),

    /// No notification with this id
    #[error("Notification {0} not found")]
    NotFound(Uuid),

    /// Only recipients may mark a notification read
    #[error("Role {role} is not a recipient of notification {id}")]
    NotARecipient {
        /// The notification
        id: Uuid,
        /// The role that tried to mark it
        role: &'static str,
    },

    /// Store lock poisoned
    #[error("Notification store lock poisoned")]
    LockPoisoned,
}
