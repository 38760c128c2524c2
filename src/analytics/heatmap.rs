//! Source-state heatmap aggregation
//!
//! One cell per source state: average history risk and shipment count,
//! positioned at the state centroid. States without a centroid row (or
//! shipments without resolved geo) are skipped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geo::state_centroid;
use crate::projection::ShipmentRow;

use super::{history_risk_score, round2};

/// One heatmap cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    /// Source state
    pub state: String,
    /// Centroid latitude
    pub lat: f64,
    /// Centroid longitude
    pub lon: f64,
    /// Mean history risk (0-100) across shipments from this state
    pub avg_risk: f64,
    /// Number of shipments from this state
    pub shipment_count: usize,
}

/// Aggregate shipments into per-source-state heatmap cells.
pub fn compute_heatmap<'a>(
    rows: impl IntoIterator<Item = &'a ShipmentRow>,
) -> Vec<HeatmapCell> {
    let mut risks_by_state: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for row in rows {
        if let Some(state) = &row.source_state {
            risks_by_state
                .entry(state.clone())
                .or_default()
                .push(history_risk_score(&row.history));
        }
    }

    let mut cells = Vec::new();
    for (state, risks) in risks_by_state {
        let Some((lat, lon)) = state_centroid(&state) else {
            continue;
        };
        let avg_risk = risks.iter().sum::<f64>() / risks.len() as f64;
        cells.push(HeatmapCell {
            state,
            lat,
            lon,
            avg_risk: round2(avg_risk),
            shipment_count: risks.len(),
        });
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ActorRole, EventType, LifecycleState};
    use crate::projection::build_state;
    use serde_json::json;
    use uuid::Uuid;

    fn created(id: &str, source_state: &str) -> crate::eventlog::Event {
        crate::eventlog::Event {
            event_id: Uuid::new_v4(),
            sequence: 1,
            timestamp: "2026-03-01T00:00:00Z".parse().unwrap(),
            shipment_id: id.to_string(),
            event_type: EventType::ShipmentCreated,
            previous_state: LifecycleState::None,
            new_state: LifecycleState::Created,
            actor_role: ActorRole::Sender,
            metadata: [("source_state".to_string(), json!(source_state))]
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn test_cells_carry_centroids_and_counts() {
        let rows = build_state(&[
            created("SHP-0000000001", "Maharashtra"),
            created("SHP-0000000002", "Maharashtra"),
            created("SHP-0000000003", "Kerala"),
        ]);
        let cells = compute_heatmap(rows.values());
        assert_eq!(cells.len(), 2);

        let mh = cells.iter().find(|c| c.state == "Maharashtra").unwrap();
        assert_eq!(mh.shipment_count, 2);
        assert!((mh.lat - 19.7515).abs() < 1e-9);
        assert!(mh.avg_risk > 0.0);
    }

    #[test]
    fn test_unknown_state_skipped() {
        let rows = build_state(&[created("SHP-0000000001", "Narnia")]);
        assert!(compute_heatmap(rows.values()).is_empty());
    }

    #[test]
    fn test_shipments_without_geo_skipped() {
        let mut event = created("SHP-0000000001", "Maharashtra");
        event.metadata.clear();
        let rows = build_state(&[event]);
        assert!(compute_heatmap(rows.values()).is_empty());
    }
}
