//! CLI error types

use thiserror::Error;

/// Result type for CLI commands
pub type CliResult<T> = Result<T, CliError>;

/// Top-level CLI error, flattened for the error JSON printed by `main`
#[derive(Debug, Error)]
pub enum CliError {
    /// Bad command-line argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration failure (missing signing key, bad cron)
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// Event log failure
    #[error(transparent)]
    EventLog(#[from] crate::eventlog::EventLogError),

    /// Snapshot engine failure
    #[error(transparent)]
    Snapshot(#[from] crate::snapshot::SnapshotError),

    /// Forensic failure
    #[error(transparent)]
    Forensic(#[from] crate::forensics::ForensicError),

    /// Notification store failure
    #[error(transparent)]
    Notify(#[from] crate::notify::NotifyError),

    /// Audit store failure
    #[error(transparent)]
    Audit(#[from] crate::access::audit::AuditError),

    /// External provider failure (client construction only; lookups degrade)
    #[error(transparent)]
    Provider(#[from] crate::external::ProviderError),

    /// Output serialization failure
    #[error("Output encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CliError {
    /// Stable code for the error JSON
    pub fn code_str(&self) -> &'static str {
        match self {
            CliError::InvalidArgument(_) => "TOWER_CLI_INVALID_ARGUMENT",
            CliError::Config(_) => "TOWER_CLI_CONFIG",
            CliError::EventLog(e) => e.code().code(),
            CliError::Snapshot(e) => e.code().code(),
            CliError::Forensic(_) => "TOWER_CLI_FORENSIC",
            CliError::Notify(_) => "TOWER_CLI_NOTIFY",
            CliError::Audit(_) => "TOWER_CLI_AUDIT",
            CliError::Provider(_) => "TOWER_CLI_PROVIDER",
            CliError::Encode(_) => "TOWER_CLI_ENCODE",
        }
    }

    /// Human-readable message for the error JSON
    pub fn message(&self) -> String {
        self.to_string()
    }
}
