//! Process-wide configuration
//!
//! Loaded once at startup, immutable afterwards. Components that need the
//! signing key or provider credentials receive them explicitly; nothing
//! reads the environment after boot.
//!
//! Required in production: `SNAPSHOT_SIGNING_KEY`. A missing key is a boot
//! failure, not a runtime fallback.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Environment variable holding the snapshot signing key
pub const SIGNING_KEY_VAR: &str = "SNAPSHOT_SIGNING_KEY";

/// Environment variable selecting the deployment mode
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

/// Development-only fallback signing key. Never valid in production.
const DEV_FALLBACK_KEY: &str = "dev-snapshot-signing-key-change-in-production";

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The signing key is required and absent
    #[error("SNAPSHOT_SIGNING_KEY must be set in production")]
    SigningKeyMissing,

    /// A cron expression failed to parse
    #[error("Invalid cron expression '{expr}': {detail}")]
    InvalidCron {
        /// The offending expression
        expr: String,
        /// Parser detail
        detail: String,
    },
}

/// Deployment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Dev fallback signing key permitted
    Development,
    /// Signing key must come from the environment
    Production,
}

impl Environment {
    fn from_env() -> Self {
        match env::var(ENVIRONMENT_VAR).as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Snapshot signing key, loaded once and treated as opaque bytes
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// Construct from raw key material (tests, explicit wiring)
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        SigningKey(bytes.into())
    }

    /// Key material for HMAC construction
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material must never reach logs
        f.write_str("SigningKey(..)")
    }
}

/// Immutable process configuration
#[derive(Debug, Clone)]
pub struct TowerConfig {
    /// Root data directory (event log, snapshots, notifications live below it)
    pub data_dir: PathBuf,

    /// Deployment mode
    pub environment: Environment,

    /// Snapshot signing key
    pub signing_key: SigningKey,

    /// Cron cadence for snapshot family refresh
    pub snapshot_cron: String,

    /// Cron trigger for the daily metrics rollup (local time)
    pub rollup_cron: String,

    /// Corridor alert threshold on fused breach probability
    pub corridor_alert_threshold: f64,

    /// OpenWeather API key, if configured
    pub weather_api_key: Option<String>,

    /// OpenRouteService API key, if configured
    pub routing_api_key: Option<String>,

    /// Brevo SMTP API key, if configured
    pub email_api_key: Option<String>,
}

impl TowerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::SigningKeyMissing` when running in production
    /// without `SNAPSHOT_SIGNING_KEY`.
    pub fn from_env(data_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let environment = Environment::from_env();

        let signing_key = match env::var(SIGNING_KEY_VAR) {
            Ok(key) => SigningKey::from_bytes(key.into_bytes()),
            Err(_) => {
                if environment == Environment::Production {
                    return Err(ConfigError::SigningKeyMissing);
                }
                SigningKey::from_bytes(DEV_FALLBACK_KEY.as_bytes().to_vec())
            }
        };

        Ok(Self {
            data_dir: data_dir.into(),
            environment,
            signing_key,
            snapshot_cron: "*/15 * * * *".to_string(),
            rollup_cron: "0 17 * * *".to_string(),
            corridor_alert_threshold: 0.6,
            weather_api_key: env::var("OPENWEATHER_API_KEY").ok(),
            routing_api_key: env::var("ORS_API_KEY").ok(),
            email_api_key: env::var("BREVO_API_KEY").ok(),
        })
    }

    /// Configuration for tests: explicit key, development mode, no providers.
    pub fn for_tests(data_dir: impl Into<PathBuf>, signing_key: &str) -> Self {
        Self {
            data_dir: data_dir.into(),
            environment: Environment::Development,
            signing_key: SigningKey::from_bytes(signing_key.as_bytes().to_vec()),
            snapshot_cron: "*/15 * * * *".to_string(),
            rollup_cron: "0 17 * * *".to_string(),
            corridor_alert_threshold: 0.6,
            weather_api_key: None,
            routing_api_key: None,
            email_api_key: None,
        }
    }

    /// Directory holding the event log and counter files
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Directory holding snapshot payloads, metadata, and the chain file
    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }

    /// Directory holding notification storage
    pub fn notification_dir(&self) -> PathBuf {
        self.data_dir.join("notifications")
    }

    /// Directory holding per-role audit denial snapshots
    pub fn audit_dir(&self) -> PathBuf {
        self.data_dir.join("audit")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_never_debug_prints_material() {
        let key = SigningKey::from_bytes(b"super-secret".to_vec());
        assert_eq!(format!("{:?}", key), "SigningKey(..)");
    }

    #[test]
    fn test_for_tests_uses_explicit_key() {
        let cfg = TowerConfig::for_tests("/tmp/ct", "k");
        assert_eq!(cfg.signing_key.as_bytes(), b"k");
        assert_eq!(cfg.environment, Environment::Development);
    }
}
