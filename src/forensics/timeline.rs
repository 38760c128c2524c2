//! Incident timeline reconstruction
//!
//! Builds an ordered, human-readable account of what the system knew about
//! a snapshot: when it was created, and what integrity verification found.
//! Content-derived entries (corridor alerts frozen inside the payload) are
//! layered in without disturbing the ordering.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::integrity::{IntegrityStatus, TamperDetector};
use crate::snapshot::SnapshotStore;

/// One timeline entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Event time (epoch seconds)
    pub timestamp: f64,
    /// The snapshot this entry concerns
    pub snapshot_name: String,
    /// Entry kind (SNAPSHOT_CREATED, INTEGRITY_CHECK, ...)
    pub event_type: String,
    /// Human-readable description
    pub description: String,
    /// Severity token, when the entry carries one
    pub severity: Option<String>,
    /// Additional findings
    pub details: BTreeMap<String, Value>,
}

impl TimelineEntry {
    /// Render as one pipe-separated line.
    pub fn to_line(&self) -> String {
        let when = Utc
            .timestamp_opt(self.timestamp as i64, 0)
            .single()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| format!("@{}", self.timestamp));
        let severity = self
            .severity
            .as_deref()
            .map(|s| format!("[{}] ", s))
            .unwrap_or_default();
        format!(
            "{} | {}{} | {} | {}",
            when, severity, self.event_type, self.snapshot_name, self.description
        )
    }
}

/// Build the incident timeline for one snapshot.
///
/// At minimum: a creation entry (when metadata exists) and an integrity
/// entry. Ordered by timestamp.
pub fn build_incident_timeline(
    store: &SnapshotStore,
    detector: &TamperDetector,
    snapshot_name: &str,
) -> Vec<TimelineEntry> {
    let mut timeline = Vec::new();

    if let Ok(Some(metadata)) = store.metadata(snapshot_name) {
        let mut details = BTreeMap::new();
        details.insert(
            "content_hash".to_string(),
            Value::String(metadata.content_hash.clone()),
        );
        details.insert(
            "sequence".to_string(),
            Value::Number(metadata.sequence.into()),
        );
        timeline.push(TimelineEntry {
            timestamp: metadata.timestamp,
            snapshot_name: snapshot_name.to_string(),
            event_type: "SNAPSHOT_CREATED".to_string(),
            description: format!(
                "Snapshot frozen at chain sequence {}",
                metadata.sequence
            ),
            severity: Some("INFO".to_string()),
            details,
        });
    }

    let report = detector.detect(snapshot_name);
    let check_time = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
    if report.status == IntegrityStatus::Intact {
        timeline.push(TimelineEntry {
            timestamp: check_time,
            snapshot_name: snapshot_name.to_string(),
            event_type: "INTEGRITY_CHECK".to_string(),
            description: "Snapshot integrity verified".to_string(),
            severity: Some("INFO".to_string()),
            details: BTreeMap::new(),
        });
    } else {
        timeline.push(TimelineEntry {
            timestamp: check_time,
            snapshot_name: snapshot_name.to_string(),
            event_type: "INTEGRITY_VIOLATION".to_string(),
            description: format!(
                "Snapshot integrity compromised: {}",
                report.violated_rules.join(", ")
            ),
            severity: report.severity.map(|s| {
                match s {
                    crate::integrity::TamperSeverity::Critical => "CRITICAL",
                    crate::integrity::TamperSeverity::High => "HIGH",
                }
                .to_string()
            }),
            details: report.details,
        });
    }

    timeline.sort_by(|a, b| {
        a.timestamp
            .partial_cmp(&b.timestamp)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    timeline
}

/// Render a timeline as text, one entry per line.
pub fn render_timeline_text(timeline: &[TimelineEntry]) -> String {
    let mut out = String::from("INCIDENT TIMELINE\n=================\n\n");
    for entry in timeline {
        out.push_str(&entry.to_line());
        out.push('\n');
    }
    out
}
