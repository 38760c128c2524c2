//! Fused shipment risk
//!
//! Combines external signals into one score on a 0-100 scale:
//!
//! ```text
//! total = 0.30 * weather + 0.30 * corridor_history + 0.40 * eta_uncertainty
//! ```
//!
//! If any single component is at 80 or above, a 10-point worst-case penalty
//! is added, capped at 100. Levels: < 30 LOW, < 60 MEDIUM, < 80 HIGH, else
//! CRITICAL. Override is recommended at total >= 80, or total >= 60 with
//! any component >= 80.

use serde::{Deserialize, Serialize};

use crate::eventlog::Event;

use super::{predict_sla_breach, round2, RiskLevel};

const WEATHER_WEIGHT: f64 = 0.30;
const CORRIDOR_WEIGHT: f64 = 0.30;
const ETA_WEIGHT: f64 = 0.40;
const WORST_CASE_TRIGGER: f64 = 80.0;
const WORST_CASE_PENALTY: f64 = 10.0;

/// External risk signals, each on a 0-100 scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskSignals {
    /// Weather disruption risk along the corridor
    pub weather: f64,
    /// Historical corridor performance risk
    pub corridor_history: f64,
    /// ETA uncertainty from the routing provider
    pub eta_uncertainty: f64,
}

impl RiskSignals {
    fn components(&self) -> [(&'static str, f64); 3] {
        [
            ("weather", self.weather),
            ("corridor_history", self.corridor_history),
            ("eta_uncertainty", self.eta_uncertainty),
        ]
    }
}

/// Fused risk assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFusion {
    /// Input signals
    pub signals: RiskSignals,
    /// Weighted total after any worst-case penalty, capped at 100
    pub total: f64,
    /// Classification of the total
    pub risk_level: RiskLevel,
    /// Whether the worst-case penalty was applied
    pub worst_case_boost: bool,
    /// Whether a manager override is recommended
    pub override_recommended: bool,
    /// One line per contributing factor
    pub explanations: Vec<String>,
}

/// Fuse external signals into one assessment.
pub fn compute_risk_fusion(signals: RiskSignals) -> RiskFusion {
    let weighted = WEATHER_WEIGHT * signals.weather
        + CORRIDOR_WEIGHT * signals.corridor_history
        + ETA_WEIGHT * signals.eta_uncertainty;

    let worst_case_boost = signals
        .components()
        .iter()
        .any(|(_, v)| *v >= WORST_CASE_TRIGGER);
    let total = if worst_case_boost {
        (weighted + WORST_CASE_PENALTY).min(100.0)
    } else {
        weighted
    };
    let total = round2(total);

    let risk_level = if total < 30.0 {
        RiskLevel::Low
    } else if total < 60.0 {
        RiskLevel::Medium
    } else if total < 80.0 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    };

    let override_recommended =
        total >= 80.0 || (total >= 60.0 && worst_case_boost);

    let mut explanations = Vec::new();
    for (name, value) in signals.components() {
        if value >= WORST_CASE_TRIGGER {
            explanations.push(format!("{} at {:.0} is in the danger band", name, value));
        } else if value >= 60.0 {
            explanations.push(format!("{} at {:.0} is elevated", name, value));
        }
    }
    if worst_case_boost {
        explanations.push("Worst-case penalty applied: a single factor can sink the shipment".to_string());
    }
    if explanations.is_empty() {
        explanations.push("All signals within normal bounds".to_string());
    }

    RiskFusion {
        signals,
        total,
        risk_level,
        worst_case_boost,
        override_recommended,
        explanations,
    }
}

/// Advisory 0-100 risk score from lifecycle history alone.
///
/// Used where external signals are unavailable (heatmap aggregation).
pub fn history_risk_score(history: &[Event]) -> f64 {
    let mut score: f64 = 10.0;

    if history.len() >= 5 {
        score += 20.0;
    }

    let sla = predict_sla_breach(history);
    match sla.risk_level {
        RiskLevel::High | RiskLevel::Critical => score += 30.0,
        RiskLevel::Medium => score += 15.0,
        RiskLevel::Low => {}
    }

    score.min(100.0)
}

/// Deterministic presentation jitter for demo statistics.
///
/// Stable for a given `(seed, shipment_id, hour)` so repeated renders within
/// the hour agree; the hour comes from an injected clock, never read here.
/// Output is in `[-5.0, 5.0]` and must never reach persisted artifacts.
pub fn demo_jitter(seed: u64, shipment_id: &str, hour: u32) -> f64 {
    // FNV-1a over the inputs; cheap and platform-stable
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325 ^ seed;
    for byte in shipment_id.bytes().chain(hour.to_le_bytes()) {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    ((hash % 1000) as f64 / 100.0) - 5.0
}
