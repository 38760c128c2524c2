//! Audit denial snapshots
//!
//! Per-role record of access denials, for audit and debugging.
//!
//! - Never stores a shipment payload, only `{shipment_id, reason_code}`
//! - Atomic writes (tmp + rename)
//! - No side effects on reads

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::eventlog::ShipmentId;
use crate::lifecycle::ActorRole;
use crate::projection::ShipmentRow;

use super::{check, DenialReason};

/// Result type for audit store operations
pub type AuditResult<T> = Result<T, AuditError>;

/// Audit store errors
#[derive(Debug, Error)]
pub enum AuditError {
    /// Filesystem failure
    #[error("Audit store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot encode/decode failure
    #[error("Audit snapshot is not valid JSON: {0}")]
    Encode(#[from] serde_json::Error),

    /// The store lock was poisoned
    #[error("Audit store lock poisoned")]
    LockPoisoned,
}

/// One denial: id and reason only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditDenial {
    /// Shipment the role was denied on
    pub shipment_id: ShipmentId,
    /// Why
    pub reason_code: DenialReason,
}

/// A per-role denial snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditDenialSnapshot {
    /// Write time
    pub generated_at: DateTime<Utc>,
    /// The role these denials apply to
    pub role: ActorRole,
    /// Denials observed during the sweep
    pub denials: Vec<AuditDenial>,
}

/// Per-role audit denial store
pub struct AuditDenialStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditDenialStore {
    /// Open (or create) the store under `dir`
    pub fn open(dir: &Path) -> AuditResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, role: ActorRole) -> PathBuf {
        self.dir
            .join(format!("denials_{}.json", role.as_str().to_lowercase()))
    }

    /// Atomically replace the denial snapshot for `role`.
    pub fn write(&self, role: ActorRole, denials: Vec<AuditDenial>) -> AuditResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| AuditError::LockPoisoned)?;

        let snapshot = AuditDenialSnapshot {
            generated_at: Utc::now(),
            role,
            denials,
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        let target = self.path_for(role);
        let tmp = target.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes())?;
        fs::rename(&tmp, &target)?;
        Ok(())
    }

    /// Read the denial snapshot for `role`, if one was ever written.
    pub fn read(&self, role: ActorRole) -> AuditResult<Option<AuditDenialSnapshot>> {
        let path = self.path_for(role);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Denial count per role, for the regulator's summary view.
    pub fn counts(&self, roles: &[ActorRole]) -> AuditResult<Vec<(ActorRole, usize)>> {
        let mut out = Vec::with_capacity(roles.len());
        for &role in roles {
            let count = self.read(role)?.map(|s| s.denials.len()).unwrap_or(0);
            out.push((role, count));
        }
        Ok(out)
    }
}

/// Sweep the read model for a role and collect every denial.
///
/// Used by the snapshot worker to refresh the audit-denials family.
pub fn collect_denials<'a>(
    role: ActorRole,
    rows: impl IntoIterator<Item = &'a ShipmentRow>,
    allowed_regions: Option<&[String]>,
) -> Vec<AuditDenial> {
    let mut denials = Vec::new();
    for row in rows {
        let decision = check(role, row, allowed_regions);
        if let Some(reason_code) = decision.denial_reason {
            denials.push(AuditDenial {
                shipment_id: row.shipment_id.clone(),
                reason_code,
            });
        }
    }
    denials
}
