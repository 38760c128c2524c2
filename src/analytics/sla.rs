//! SLA breach prediction
//!
//! Heuristic ETA model over shipment lifecycle history:
//!
//! ```text
//! eta_hours       = max(8, 2.2 * k^1.3)        k = history length
//! sla_utilization = min(hours_elapsed / eta_hours, 1.5)
//! ```
//!
//! Buckets: utilization < 0.6 -> LOW (0.1), < 0.85 -> MEDIUM (0.4),
//! else HIGH (0.8).

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::eventlog::Event;

use super::{round2, RiskLevel};

/// SLA prediction for one shipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaPrediction {
    /// Heuristic ETA in hours
    pub eta_hours: f64,
    /// Hours between the first and last history entry
    pub hours_elapsed: f64,
    /// `elapsed / eta`, capped at 1.5
    pub sla_utilization: f64,
    /// Bucketed breach probability
    pub breach_probability: f64,
    /// Bucketed risk level
    pub risk_level: RiskLevel,
}

impl SlaPrediction {
    fn quiet() -> Self {
        Self {
            eta_hours: 0.0,
            hours_elapsed: 0.0,
            sla_utilization: 0.0,
            breach_probability: 0.0,
            risk_level: RiskLevel::Low,
        }
    }
}

/// Predict SLA breach probability from ordered lifecycle history.
///
/// Histories with fewer than two events have no elapsed interval and come
/// back quiet (LOW, probability 0).
pub fn predict_sla_breach(history: &[Event]) -> SlaPrediction {
    if history.len() < 2 {
        return SlaPrediction::quiet();
    }

    // History is ordered by sequence; first and last bound the interval
    let start = history[0].timestamp;
    let end = history[history.len() - 1].timestamp;
    let hours_elapsed = (end - start).num_seconds().abs() as f64 / 3600.0;

    let k = history.len() as f64;
    let eta_hours = (2.2 * k.powf(1.3)).max(8.0);

    let sla_utilization = (hours_elapsed / eta_hours).min(1.5);

    let (breach_probability, risk_level) = if sla_utilization < 0.6 {
        (0.1, RiskLevel::Low)
    } else if sla_utilization < 0.85 {
        (0.4, RiskLevel::Medium)
    } else {
        (0.8, RiskLevel::High)
    };

    SlaPrediction {
        eta_hours: round2(eta_hours),
        hours_elapsed: round2(hours_elapsed),
        sla_utilization: round2(sla_utilization),
        breach_probability,
        risk_level,
    }
}

/// Parse a timestamp out of snapshot-derived JSON.
///
/// Accepts ISO 8601 with or without a zone (naive values are assumed UTC)
/// and numeric epoch seconds. Forensic payloads round-trip through JSON, so
/// this is deliberately forgiving.
pub fn parse_timestamp_tolerant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let secs = n.as_f64()?;
            Utc.timestamp_opt(secs as i64, ((secs.fract()) * 1e9) as u32)
                .single()
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
                return Some(dt.with_timezone(&Utc));
            }
            // Naive timestamps are assumed UTC
            if let Ok(naive) =
                chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
            {
                return Some(Utc.from_utc_datetime(&naive));
            }
            if let Ok(naive) =
                chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
            {
                return Some(Utc.from_utc_datetime(&naive));
            }
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ActorRole, EventType, LifecycleState};
    use serde_json::json;
    use uuid::Uuid;

    fn history(timestamps: &[&str]) -> Vec<Event> {
        timestamps
            .iter()
            .enumerate()
            .map(|(i, ts)| Event {
                event_id: Uuid::new_v4(),
                sequence: i as u64 + 1,
                timestamp: ts.parse().unwrap(),
                shipment_id: "SHP-0000000001".to_string(),
                event_type: if i == 0 {
                    EventType::ShipmentCreated
                } else {
                    EventType::HoldForReview
                },
                previous_state: LifecycleState::Created,
                new_state: LifecycleState::Created,
                actor_role: ActorRole::System,
                metadata: Default::default(),
            })
            .collect()
    }

    #[test]
    fn test_two_events_thirty_hours_is_high() {
        // k=2 -> eta = max(8, 2.2*2^1.3 ~= 5.42) = 8; 30/8 capped at 1.5
        let prediction =
            predict_sla_breach(&history(&["2026-03-01T00:00:00Z", "2026-03-02T06:00:00Z"]));
        assert_eq!(prediction.eta_hours, 8.0);
        assert_eq!(prediction.sla_utilization, 1.5);
        assert_eq!(prediction.breach_probability, 0.8);
        assert_eq!(prediction.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_six_events_one_hour_is_low() {
        // k=6 -> eta ~= 2.2*6^1.3 ~= 22.6; utilization ~= 0.044
        let prediction = predict_sla_breach(&history(&[
            "2026-03-01T00:00:00Z",
            "2026-03-01T00:10:00Z",
            "2026-03-01T00:20:00Z",
            "2026-03-01T00:30:00Z",
            "2026-03-01T00:45:00Z",
            "2026-03-01T01:00:00Z",
        ]));
        assert!(prediction.eta_hours > 22.0 && prediction.eta_hours < 23.0);
        assert!(prediction.sla_utilization < 0.05);
        assert_eq!(prediction.breach_probability, 0.1);
        assert_eq!(prediction.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_short_history_is_quiet() {
        assert_eq!(
            predict_sla_breach(&history(&["2026-03-01T00:00:00Z"])),
            SlaPrediction {
                eta_hours: 0.0,
                hours_elapsed: 0.0,
                sla_utilization: 0.0,
                breach_probability: 0.0,
                risk_level: RiskLevel::Low,
            }
        );
    }

    #[test]
    fn test_medium_bucket() {
        // k=2 -> eta 8h; 5h elapsed -> utilization 0.625
        let prediction =
            predict_sla_breach(&history(&["2026-03-01T00:00:00Z", "2026-03-01T05:00:00Z"]));
        assert_eq!(prediction.breach_probability, 0.4);
        assert_eq!(prediction.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_tolerant_parsing() {
        assert_eq!(
            parse_timestamp_tolerant(&json!("2026-03-01T08:00:00Z")).unwrap(),
            "2026-03-01T08:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(
            parse_timestamp_tolerant(&json!("2026-03-01T08:00:00+05:30"))
                .unwrap()
                .to_rfc3339(),
            "2026-03-01T02:30:00+00:00"
        );
        // Naive assumed UTC
        assert_eq!(
            parse_timestamp_tolerant(&json!("2026-03-01T08:00:00")).unwrap(),
            "2026-03-01T08:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        // Numeric epoch
        assert!(parse_timestamp_tolerant(&json!(1_772_000_000.0)).is_some());
        assert!(parse_timestamp_tolerant(&json!(null)).is_none());
    }
}
