//! Analytics engines
//!
//! Every engine here consumes read models only; none of them touch the
//! event log directly. Outputs are advisory (no state changes) and feed the
//! snapshot families and the notification dispatcher.

mod corridor;
mod heatmap;
mod risk;
mod sla;

pub use corridor::{
    classify_corridor_risk, compute_corridor_sla_health, detect_corridor_alerts, CorridorAlert,
    CorridorSlaHealth,
};
pub use heatmap::{compute_heatmap, HeatmapCell};
pub use risk::{
    compute_risk_fusion, demo_jitter, history_risk_score, RiskFusion, RiskSignals,
};
pub use sla::{parse_timestamp_tolerant, predict_sla_breach, SlaPrediction};

use serde::{Deserialize, Serialize};

/// Risk classification shared across engines
///
/// SLA and corridor analytics use the first three levels; fused shipment
/// risk can also reach `CRITICAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Comfortable margin
    Low,
    /// Worth watching
    Medium,
    /// Intervention likely needed
    High,
    /// Multiple signals converge
    Critical,
}

impl RiskLevel {
    /// Stable string token
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round to two decimals for reported metrics
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
