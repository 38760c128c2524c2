//! Corridor SLA health and alerts
//!
//! Shipments are grouped by corridor (`"<source_state> -> <destination_state>"`)
//! and their SLA predictions fused:
//!
//! ```text
//! final = 0.7 * avg_breach + 0.3 * max_breach
//! ```
//!
//! Risk levels: final >= 0.6 HIGH, >= 0.3 MEDIUM, else LOW. Alerts fire at
//! the configured threshold.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::projection::ShipmentRow;

use super::{predict_sla_breach, round2, RiskLevel};

/// SLA health for one corridor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorridorSlaHealth {
    /// `"<source_state> -> <destination_state>"`
    pub corridor: String,
    /// Shipments grouped into this corridor
    pub shipments: usize,
    /// Mean heuristic ETA
    pub avg_eta_hours: f64,
    /// Mean SLA utilization
    pub avg_sla_utilization: f64,
    /// Mean breach probability
    pub avg_breach_probability: f64,
    /// Worst breach probability
    pub max_breach_probability: f64,
    /// `0.7 * avg + 0.3 * max`
    pub final_breach_probability: f64,
    /// Classification of the fused probability
    pub risk_level: RiskLevel,
}

/// An alert for a corridor whose fused breach probability crossed the line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorridorAlert {
    /// Affected corridor
    pub corridor: String,
    /// HIGH at the threshold, CRITICAL at 0.85+
    pub severity: RiskLevel,
    /// Mean breach probability at alert time
    pub avg_breach: f64,
    /// Human-readable cause
    pub reason: String,
}

/// Classify a fused corridor breach probability
pub fn classify_corridor_risk(final_breach_probability: f64) -> RiskLevel {
    if final_breach_probability >= 0.6 {
        RiskLevel::High
    } else if final_breach_probability >= 0.3 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Compute SLA health per corridor.
///
/// Shipments without a corridor (unresolved geo) are skipped.
pub fn compute_corridor_sla_health<'a>(
    rows: impl IntoIterator<Item = &'a ShipmentRow>,
) -> BTreeMap<String, CorridorSlaHealth> {
    let mut buckets: BTreeMap<String, Vec<&ShipmentRow>> = BTreeMap::new();
    for row in rows {
        if let Some(corridor) = &row.corridor {
            buckets.entry(corridor.clone()).or_default().push(row);
        }
    }

    let mut health = BTreeMap::new();
    for (corridor, shipments) in buckets {
        let predictions: Vec<_> = shipments
            .iter()
            .map(|row| predict_sla_breach(&row.history))
            .collect();
        if predictions.is_empty() {
            continue;
        }

        let n = predictions.len() as f64;
        let avg_eta = predictions.iter().map(|p| p.eta_hours).sum::<f64>() / n;
        let avg_util = predictions.iter().map(|p| p.sla_utilization).sum::<f64>() / n;
        let avg_breach = predictions
            .iter()
            .map(|p| p.breach_probability)
            .sum::<f64>()
            / n;
        let max_breach = predictions
            .iter()
            .map(|p| p.breach_probability)
            .fold(0.0, f64::max);

        let final_breach = round2(0.7 * avg_breach + 0.3 * max_breach);

        health.insert(
            corridor.clone(),
            CorridorSlaHealth {
                corridor,
                shipments: shipments.len(),
                avg_eta_hours: round2(avg_eta),
                avg_sla_utilization: round2(avg_util),
                avg_breach_probability: round2(avg_breach),
                max_breach_probability: round2(max_breach),
                final_breach_probability: final_breach,
                risk_level: classify_corridor_risk(final_breach),
            },
        );
    }

    health
}

/// Alerts for corridors whose fused breach probability reached `threshold`.
pub fn detect_corridor_alerts(
    health: &BTreeMap<String, CorridorSlaHealth>,
    threshold: f64,
) -> Vec<CorridorAlert> {
    let mut alerts = Vec::new();
    for entry in health.values() {
        if entry.final_breach_probability >= threshold {
            let severity = if entry.final_breach_probability >= 0.85 {
                RiskLevel::Critical
            } else {
                RiskLevel::High
            };
            alerts.push(CorridorAlert {
                corridor: entry.corridor.clone(),
                severity,
                avg_breach: entry.avg_breach_probability,
                reason: format!(
                    "Fused breach probability {:.2} reached threshold {:.2} across {} shipments",
                    entry.final_breach_probability, threshold, entry.shipments
                ),
            });
        }
    }
    alerts
}
