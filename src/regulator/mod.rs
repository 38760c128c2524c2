//! Regulator surface
//!
//! Regulators see snapshots and nothing else. The policy is an explicit
//! allow-list; the guard fails closed, so an operation that is not
//! explicitly allowed is forbidden — including anything that would touch
//! the emitter, the live read models, or live analytics.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::forensics::{EvidenceExporter, ExportFormat, ForensicError};
use crate::snapshot::{SnapshotError, SnapshotStore};

/// Result type for regulator operations
pub type RegulatorResult<T> = Result<T, RegulatorError>;

/// Snapshot families a regulator may read
pub const ALLOWED_SNAPSHOTS: &[&str] = &[
    "shipment_index",
    "corridor_sla",
    "heatmap",
    "corridor_alerts",
    "audit_denials",
    "daily_metrics",
];

/// Operations a regulator can request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegulatorOperation {
    /// Read one allow-listed snapshot
    ReadSnapshot(String),
    /// Export an allow-listed snapshot as evidence
    ComplianceExport(String),
    /// View the per-role denial summary
    ViewDenialSummary,
    /// View per-role denial counts
    ViewDenialCounts,
    /// Forbidden: emit a domain event
    EmitEvent,
    /// Forbidden: read live read models
    ReadLiveReadModel,
    /// Forbidden: run analytics over live data
    RunLiveAnalytics,
}

impl RegulatorOperation {
    fn describe(&self) -> String {
        match self {
            RegulatorOperation::ReadSnapshot(name) => format!("read snapshot '{}'", name),
            RegulatorOperation::ComplianceExport(name) => {
                format!("compliance export of '{}'", name)
            }
            RegulatorOperation::ViewDenialSummary => "view denial summary".to_string(),
            RegulatorOperation::ViewDenialCounts => "view denial counts".to_string(),
            RegulatorOperation::EmitEvent => "emit a domain event".to_string(),
            RegulatorOperation::ReadLiveReadModel => "read live read models".to_string(),
            RegulatorOperation::RunLiveAnalytics => "run analytics on live data".to_string(),
        }
    }
}

/// Regulator errors
#[derive(Debug, Error)]
pub enum RegulatorError {
    /// The operation is outside the allow-list. Fail closed.
    #[error("Regulator forbidden operation: {operation}")]
    ForbiddenOperation {
        /// What was attempted
        operation: String,
    },

    /// Snapshot store failure
    #[error("Snapshot store failure: {0}")]
    Store(#[from] SnapshotError),

    /// Export failure
    #[error("Export failure: {0}")]
    Export(#[from] ForensicError),
}

/// Enforce the regulator policy for one operation.
///
/// # Errors
///
/// `RegulatorError::ForbiddenOperation` for everything outside the
/// allow-list, including unknown snapshot names.
pub fn assert_allowed(operation: &RegulatorOperation) -> RegulatorResult<()> {
    let allowed = match operation {
        RegulatorOperation::ReadSnapshot(name)
        | RegulatorOperation::ComplianceExport(name) => {
            ALLOWED_SNAPSHOTS.contains(&name.as_str())
        }
        RegulatorOperation::ViewDenialSummary | RegulatorOperation::ViewDenialCounts => true,
        RegulatorOperation::EmitEvent
        | RegulatorOperation::ReadLiveReadModel
        | RegulatorOperation::RunLiveAnalytics => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(RegulatorError::ForbiddenOperation {
            operation: operation.describe(),
        })
    }
}

/// Snapshot-only regulator views
///
/// Holds a snapshot store and an exporter; deliberately NO event log, NO
/// projector, NO analytics engine.
pub struct RegulatorViews {
    store: Arc<SnapshotStore>,
    exporter: EvidenceExporter,
}

impl RegulatorViews {
    /// Bind to a snapshot store.
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        let exporter = EvidenceExporter::new(Arc::clone(&store));
        Self { store, exporter }
    }

    /// Read an allow-listed snapshot. Missing snapshots come back `None`
    /// rather than failing the view.
    pub fn read_snapshot(&self, name: &str) -> RegulatorResult<Option<Value>> {
        assert_allowed(&RegulatorOperation::ReadSnapshot(name.to_string()))?;
        Ok(self.store.read(name)?)
    }

    /// Per-role denial lists from the frozen `audit_denials` snapshot.
    ///
    /// Flat structure, no joins; an absent snapshot is an empty map.
    pub fn denial_summary(&self) -> RegulatorResult<BTreeMap<String, Value>> {
        assert_allowed(&RegulatorOperation::ViewDenialSummary)?;
        let payload = self.store.read("audit_denials")?;
        match payload {
            Some(Value::Object(map)) => Ok(map.into_iter().collect()),
            _ => Ok(BTreeMap::new()),
        }
    }

    /// Denial counts per role, from the same frozen snapshot.
    pub fn denial_counts(&self) -> RegulatorResult<BTreeMap<String, usize>> {
        assert_allowed(&RegulatorOperation::ViewDenialCounts)?;
        let summary = self.denial_summary()?;
        let mut counts = BTreeMap::new();
        for (role, snapshot) in summary {
            let count = snapshot
                .get("denials")
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0);
            counts.insert(role, count);
        }
        Ok(counts)
    }

    /// Export an allow-listed snapshot as an evidence archive.
    pub fn compliance_export(
        &self,
        name: &str,
        out_dir: &Path,
    ) -> RegulatorResult<PathBuf> {
        assert_allowed(&RegulatorOperation::ComplianceExport(name.to_string()))?;
        Ok(self
            .exporter
            .export(name, ExportFormat::Archive, true, out_dir)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_operations_fail_closed() {
        for operation in [
            RegulatorOperation::EmitEvent,
            RegulatorOperation::ReadLiveReadModel,
            RegulatorOperation::RunLiveAnalytics,
        ] {
            assert!(matches!(
                assert_allowed(&operation),
                Err(RegulatorError::ForbiddenOperation { .. })
            ));
        }
    }

    #[test]
    fn test_unlisted_snapshot_forbidden() {
        let operation = RegulatorOperation::ReadSnapshot("live_state".to_string());
        assert!(assert_allowed(&operation).is_err());
    }

    #[test]
    fn test_allowed_snapshots_pass_the_guard() {
        for name in ALLOWED_SNAPSHOTS {
            assert!(
                assert_allowed(&RegulatorOperation::ReadSnapshot(name.to_string())).is_ok()
            );
            assert!(assert_allowed(&RegulatorOperation::ComplianceExport(
                name.to_string()
            ))
            .is_ok());
        }
    }
}
