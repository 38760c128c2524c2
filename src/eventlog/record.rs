//! Event records and their wire format
//!
//! One JSON object per line. Keys: `event_id`, `sequence`, `timestamp`
//! (ISO 8601, UTC, `Z`-suffixed), `shipment_id`, `event_type`,
//! `previous_state`, `new_state`, `actor_role`, `metadata`.
//!
//! Events are immutable once appended. The first event of every shipment
//! has `previous_state = NONE`, `event_type = SHIPMENT_CREATED`, and
//! `sequence = 1`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::lifecycle::{ActorRole, EventType, LifecycleState};

/// Shipment identifier (`SHP-` + 10-digit zero-padded counter)
pub type ShipmentId = String;

/// An immutable domain event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Globally unique event id
    pub event_id: Uuid,

    /// Per-shipment sequence, strictly increasing from 1
    pub sequence: u64,

    /// Assignment time; non-decreasing within a shipment
    pub timestamp: DateTime<Utc>,

    /// Owning shipment
    pub shipment_id: ShipmentId,

    /// What happened
    pub event_type: EventType,

    /// Lifecycle state before this event
    pub previous_state: LifecycleState,

    /// Lifecycle state after this event
    pub new_state: LifecycleState,

    /// Who emitted it
    pub actor_role: ActorRole,

    /// Opaque payload; last-writer-wins when merged by the projector
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl Event {
    /// Encode as a single JSONL line (no trailing newline)
    pub fn to_jsonl(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode one JSONL line
    pub fn from_jsonl(line: &str) -> serde_json::Result<Event> {
        serde_json::from_str(line)
    }
}

/// An event before the log has assigned identity, sequence, and time
///
/// Built by the emitter; the log fills in the rest on append.
#[derive(Debug, Clone)]
pub struct EventCandidate {
    /// Owning shipment
    pub shipment_id: ShipmentId,

    /// What is happening
    pub event_type: EventType,

    /// Caller's view of the current state (checked against the log)
    pub previous_state: LifecycleState,

    /// Requested next state
    pub new_state: LifecycleState,

    /// Acting role
    pub actor_role: ActorRole,

    /// Payload
    pub metadata: BTreeMap<String, Value>,
}
