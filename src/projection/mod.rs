//! Read-model projection
//!
//! Deterministic replay of the event log into per-shipment rows plus the
//! derived indexes the analytics engines group by. No business logic, no
//! external calls: the same events always produce the same rows.
//!
//! Geo fields and the corridor are set only from `SHIPMENT_CREATED`;
//! `METADATA_UPDATED` touches the raw source/destination strings and
//! nothing else. The corridor never mutates once set.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::eventlog::{Event, EventLog, EventLogError, EventLogResult, ShipmentId};
use crate::lifecycle::{ActorRole, EventType, LifecycleState};

/// Materialized view of one shipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRow {
    /// Shipment id
    pub shipment_id: ShipmentId,

    /// `last_event.new_state`
    pub current_state: LifecycleState,

    /// Timestamp of the first event
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last event
    pub last_updated: DateTime<Utc>,

    /// Number of events replayed into this row
    pub event_count: usize,

    /// Raw source string as entered by the sender
    pub source: Option<String>,

    /// Raw destination string
    pub destination: Option<String>,

    /// Resolved source state (from creation only)
    pub source_state: Option<String>,

    /// Resolved destination state (from creation only)
    pub destination_state: Option<String>,

    /// Resolver confidence for the source
    pub source_geo_confidence: Option<f64>,

    /// Resolver confidence for the destination
    pub destination_geo_confidence: Option<f64>,

    /// `"<source_state> -> <destination_state>"`, immutable once set
    pub corridor: Option<String>,

    /// Full ordered event history
    pub history: Vec<Event>,

    /// Last-writer-wins merge of all event metadata
    pub current_payload: BTreeMap<String, Value>,

    /// Distinct roles seen in the history
    pub actors_involved: BTreeSet<ActorRole>,

    /// Ordered event types, one per history entry
    pub event_sequence: Vec<EventType>,
}

impl ShipmentRow {
    fn init(event: &Event) -> Self {
        Self {
            shipment_id: event.shipment_id.clone(),
            current_state: event.new_state,
            created_at: event.timestamp,
            last_updated: event.timestamp,
            event_count: 0,
            source: None,
            destination: None,
            source_state: None,
            destination_state: None,
            source_geo_confidence: None,
            destination_geo_confidence: None,
            corridor: None,
            history: Vec::new(),
            current_payload: BTreeMap::new(),
            actors_involved: BTreeSet::new(),
            event_sequence: Vec::new(),
        }
    }
}

fn metadata_str(event: &Event, key: &str) -> Option<String> {
    event
        .metadata
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn metadata_f64(event: &Event, key: &str) -> Option<f64> {
    event.metadata.get(key).and_then(Value::as_f64)
}

/// Replay events into the shipment read model. Pure and deterministic.
pub fn build_state(events: &[Event]) -> BTreeMap<ShipmentId, ShipmentRow> {
    let mut shipments: BTreeMap<ShipmentId, ShipmentRow> = BTreeMap::new();

    for event in events {
        let row = shipments
            .entry(event.shipment_id.clone())
            .or_insert_with(|| ShipmentRow::init(event));

        row.current_state = event.new_state;
        row.last_updated = event.timestamp;

        if event.event_type == EventType::ShipmentCreated {
            row.source = metadata_str(event, "source");
            row.destination = metadata_str(event, "destination");
            row.source_state = metadata_str(event, "source_state");
            row.destination_state = metadata_str(event, "destination_state");
            row.source_geo_confidence = metadata_f64(event, "source_geo_confidence");
            row.destination_geo_confidence = metadata_f64(event, "destination_geo_confidence");

            if row.corridor.is_none() {
                if let (Some(src), Some(dst)) = (&row.source_state, &row.destination_state) {
                    row.corridor = Some(format!("{} -> {}", src, dst));
                }
            }
        }

        if event.event_type == EventType::MetadataUpdated {
            if let Some(source) = metadata_str(event, "source") {
                row.source = Some(source);
            }
            if let Some(destination) = metadata_str(event, "destination") {
                row.destination = Some(destination);
            }
        }

        for (key, value) in &event.metadata {
            row.current_payload.insert(key.clone(), value.clone());
        }

        row.actors_involved.insert(event.actor_role);
        row.event_sequence.push(event.event_type);
        row.history.push(event.clone());
        row.event_count = row.history.len();
    }

    shipments
}

/// Shipment ids grouped by current lifecycle state
pub fn index_by_state(
    rows: &BTreeMap<ShipmentId, ShipmentRow>,
) -> BTreeMap<LifecycleState, Vec<ShipmentId>> {
    let mut index: BTreeMap<LifecycleState, Vec<ShipmentId>> = BTreeMap::new();
    for (id, row) in rows {
        index.entry(row.current_state).or_default().push(id.clone());
    }
    index
}

/// Shipment ids grouped by resolved source state
pub fn index_by_source_state(
    rows: &BTreeMap<ShipmentId, ShipmentRow>,
) -> BTreeMap<String, Vec<ShipmentId>> {
    group_by(rows, |row| row.source_state.clone())
}

/// Shipment ids grouped by resolved destination state
pub fn index_by_destination_state(
    rows: &BTreeMap<ShipmentId, ShipmentRow>,
) -> BTreeMap<String, Vec<ShipmentId>> {
    group_by(rows, |row| row.destination_state.clone())
}

/// Shipment ids grouped by corridor
pub fn index_by_corridor(
    rows: &BTreeMap<ShipmentId, ShipmentRow>,
) -> BTreeMap<String, Vec<ShipmentId>> {
    group_by(rows, |row| row.corridor.clone())
}

fn group_by(
    rows: &BTreeMap<ShipmentId, ShipmentRow>,
    key: impl Fn(&ShipmentRow) -> Option<String>,
) -> BTreeMap<String, Vec<ShipmentId>> {
    let mut index: BTreeMap<String, Vec<ShipmentId>> = BTreeMap::new();
    for (id, row) in rows {
        if let Some(k) = key(row) {
            index.entry(k).or_default().push(id.clone());
        }
    }
    index
}

/// Cached projector over an event log
///
/// The derived state cache is keyed by the log's version counter and
/// rebuilt lazily under a double-checked lock, so readers are lock-free
/// once built and never observe a half-built map.
pub struct Projector {
    log: Arc<EventLog>,
    cache: RwLock<Option<(u64, Arc<BTreeMap<ShipmentId, ShipmentRow>>)>>,
}

impl Projector {
    /// Wrap an event log
    pub fn new(log: Arc<EventLog>) -> Self {
        Self {
            log,
            cache: RwLock::new(None),
        }
    }

    /// The full read model, rebuilt if the log has advanced
    pub fn state(&self) -> EventLogResult<Arc<BTreeMap<ShipmentId, ShipmentRow>>> {
        let version = self.log.version();

        {
            let cache = self
                .cache
                .read()
                .map_err(|_| EventLogError::corruption("Projector cache lock poisoned"))?;
            if let Some((built_version, ref rows)) = *cache {
                if built_version == version {
                    return Ok(Arc::clone(rows));
                }
            }
        }

        let mut cache = self
            .cache
            .write()
            .map_err(|_| EventLogError::corruption("Projector cache lock poisoned"))?;
        if let Some((built_version, ref rows)) = *cache {
            if built_version == version {
                return Ok(Arc::clone(rows));
            }
        }

        let events = self.log.read_all()?;
        let rows = Arc::new(build_state(&events.events));
        *cache = Some((version, Arc::clone(&rows)));
        Ok(rows)
    }

    /// One shipment's row, if it exists
    pub fn shipment(&self, shipment_id: &str) -> EventLogResult<Option<ShipmentRow>> {
        Ok(self.state()?.get(shipment_id).cloned())
    }
}
