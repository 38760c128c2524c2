//! Periodic snapshot worker
//!
//! Refreshes every snapshot family at the configured cron cadence and runs
//! the daily metrics rollup at its own trigger (17:00 local by default).
//! Families:
//!
//! - `shipment_index` — the full shipment read model
//! - `corridor_sla` — per-corridor SLA health
//! - `heatmap` — per-source-state risk cells
//! - `corridor_alerts` — corridors over the alert threshold
//! - `audit_denials` — per-role denial snapshots, aggregated
//! - `daily_metrics` — the rollup (trigger-driven, not cadence-driven)
//!
//! A family that fails to freeze is logged and skipped; the worker never
//! aborts the sweep, and the previous generation of that family stays
//! visible.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate};
use croner::Cron;
use serde_json::{json, Value};

use crate::access::audit::AuditDenialStore;
use crate::analytics::{
    compute_corridor_sla_health, compute_heatmap, detect_corridor_alerts, predict_sla_breach,
};
use crate::config::{ConfigError, TowerConfig};
use crate::lifecycle::{ActorRole, LifecycleState};
use crate::observability::Logger;
use crate::projection::Projector;

use super::errors::{SnapshotError, SnapshotResult};
use super::metadata::SnapshotMetadata;
use super::store::SnapshotStore;

/// Snapshot family names, in refresh order
pub const SNAPSHOT_FAMILIES: &[&str] = &[
    "shipment_index",
    "corridor_sla",
    "heatmap",
    "corridor_alerts",
    "audit_denials",
];

/// Roles whose denial snapshots are aggregated into `audit_denials`
const AUDITED_ROLES: &[ActorRole] = &[
    ActorRole::SenderManager,
    ActorRole::SenderSupervisor,
    ActorRole::ReceiverManager,
    ActorRole::WarehouseManager,
    ActorRole::Viewer,
];

/// Cadence-driven snapshot refresher
pub struct SnapshotWorker {
    projector: Arc<Projector>,
    store: Arc<SnapshotStore>,
    audit: Arc<AuditDenialStore>,
    alert_threshold: f64,
    cadence: Cron,
    rollup_trigger: Cron,
    last_refresh: Option<DateTime<Local>>,
    last_rollup: Option<NaiveDate>,
}

impl SnapshotWorker {
    /// Wire a worker from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidCron` when either cron expression fails
    /// to parse.
    pub fn new(
        projector: Arc<Projector>,
        store: Arc<SnapshotStore>,
        audit: Arc<AuditDenialStore>,
        config: &TowerConfig,
    ) -> Result<Self, ConfigError> {
        let cadence = Cron::new(&config.snapshot_cron)
            .parse()
            .map_err(|e| ConfigError::InvalidCron {
                expr: config.snapshot_cron.clone(),
                detail: e.to_string(),
            })?;
        let rollup_trigger =
            Cron::new(&config.rollup_cron)
                .parse()
                .map_err(|e| ConfigError::InvalidCron {
                    expr: config.rollup_cron.clone(),
                    detail: e.to_string(),
                })?;

        Ok(Self {
            projector,
            store,
            audit,
            alert_threshold: config.corridor_alert_threshold,
            cadence,
            rollup_trigger,
            last_refresh: None,
            last_rollup: None,
        })
    }

    /// Run whatever is due at `now`. Returns metadata for every family that
    /// was frozen during this poll.
    pub fn poll(&mut self, now: DateTime<Local>) -> Vec<SnapshotMetadata> {
        let mut written = Vec::new();

        if self.refresh_due(now) {
            written.extend(self.refresh_all());
            self.last_refresh = Some(now);
        }

        if self.rollup_due(now) {
            match self.write_daily_metrics() {
                Ok(metadata) => {
                    written.push(metadata);
                    self.last_rollup = Some(now.date_naive());
                }
                Err(e) => {
                    Logger::error("ROLLUP_FAILED", &[("error", &e.to_string())]);
                }
            }
        }

        written
    }

    fn refresh_due(&self, now: DateTime<Local>) -> bool {
        match self.last_refresh {
            None => true,
            Some(last) => match self.cadence.find_next_occurrence(&last, false) {
                Ok(next) => next <= now,
                Err(_) => false,
            },
        }
    }

    fn rollup_due(&self, now: DateTime<Local>) -> bool {
        if self.last_rollup == Some(now.date_naive()) {
            return false;
        }
        // Due once the trigger time has passed today
        let start_of_day = match now.date_naive().and_hms_opt(0, 0, 0) {
            Some(naive) => match naive.and_local_timezone(Local) {
                chrono::LocalResult::Single(dt) => dt,
                _ => return false,
            },
            None => return false,
        };
        match self.rollup_trigger.find_next_occurrence(&start_of_day, true) {
            Ok(trigger) => trigger <= now,
            Err(_) => false,
        }
    }

    /// Freeze every cadence-driven family. Individual failures are logged
    /// and skipped.
    pub fn refresh_all(&self) -> Vec<SnapshotMetadata> {
        let mut written = Vec::new();
        for &family in SNAPSHOT_FAMILIES {
            match self.refresh_family(family) {
                Ok(metadata) => {
                    Logger::info(
                        "SNAPSHOT_WRITTEN",
                        &[
                            ("family", family),
                            ("sequence", &metadata.sequence.to_string()),
                        ],
                    );
                    written.push(metadata);
                }
                Err(e) => {
                    Logger::error(
                        "SNAPSHOT_FAMILY_FAILED",
                        &[("family", family), ("error", &e.to_string())],
                    );
                }
            }
        }
        written
    }

    /// Freeze one family by name.
    pub fn refresh_family(&self, family: &str) -> SnapshotResult<SnapshotMetadata> {
        let payload = self.family_payload(family)?;
        self.store.write(family, &payload)
    }

    fn family_payload(&self, family: &str) -> SnapshotResult<Value> {
        let rows = self
            .projector
            .state()
            .map_err(|e| SnapshotError::encode(format!("Projection failed: {}", e)))?;

        let payload = match family {
            "shipment_index" => serde_json::to_value(&*rows)
                .map_err(|e| SnapshotError::encode(format!("Index encode: {}", e)))?,
            "corridor_sla" => {
                let health = compute_corridor_sla_health(rows.values());
                serde_json::to_value(health)
                    .map_err(|e| SnapshotError::encode(format!("SLA encode: {}", e)))?
            }
            "heatmap" => {
                let cells = compute_heatmap(rows.values());
                serde_json::to_value(cells)
                    .map_err(|e| SnapshotError::encode(format!("Heatmap encode: {}", e)))?
            }
            "corridor_alerts" => {
                let health = compute_corridor_sla_health(rows.values());
                let alerts = detect_corridor_alerts(&health, self.alert_threshold);
                serde_json::to_value(alerts)
                    .map_err(|e| SnapshotError::encode(format!("Alerts encode: {}", e)))?
            }
            "audit_denials" => {
                let mut by_role = serde_json::Map::new();
                for &role in AUDITED_ROLES {
                    let snapshot = self.audit.read(role).map_err(|e| {
                        SnapshotError::encode(format!("Audit read failed: {}", e))
                    })?;
                    if let Some(snapshot) = snapshot {
                        let value = serde_json::to_value(&snapshot).map_err(|e| {
                            SnapshotError::encode(format!("Audit encode: {}", e))
                        })?;
                        by_role.insert(role.as_str().to_string(), value);
                    }
                }
                Value::Object(by_role)
            }
            other => {
                return Err(SnapshotError::encode(format!(
                    "Unknown snapshot family '{}'",
                    other
                )))
            }
        };
        Ok(payload)
    }

    /// Aggregate per-day shipment metrics and freeze them.
    pub fn write_daily_metrics(&self) -> SnapshotResult<SnapshotMetadata> {
        let rows = self
            .projector
            .state()
            .map_err(|e| SnapshotError::encode(format!("Projection failed: {}", e)))?;

        #[derive(Default)]
        struct DayAgg {
            created: u64,
            delivered: u64,
            cancelled: u64,
            breach_sum: f64,
            breach_count: u64,
        }

        let mut days: BTreeMap<NaiveDate, DayAgg> = BTreeMap::new();
        for row in rows.values() {
            let day = days.entry(row.created_at.date_naive()).or_default();
            day.created += 1;
            match row.current_state {
                LifecycleState::Delivered | LifecycleState::LifecycleClosed => {
                    day.delivered += 1
                }
                LifecycleState::Cancelled => day.cancelled += 1,
                _ => {}
            }
            let sla = predict_sla_breach(&row.history);
            day.breach_sum += sla.breach_probability;
            day.breach_count += 1;
        }

        let mut payload = serde_json::Map::new();
        for (date, agg) in days {
            let avg_breach = if agg.breach_count > 0 {
                agg.breach_sum / agg.breach_count as f64
            } else {
                0.0
            };
            payload.insert(
                date.to_string(),
                json!({
                    "created": agg.created,
                    "delivered": agg.delivered,
                    "cancelled": agg.cancelled,
                    "avg_breach_probability": (avg_breach * 100.0).round() / 100.0,
                }),
            );
        }

        self.store
            .write("daily_metrics", &Value::Object(payload))
    }
}
