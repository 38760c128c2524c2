//! The event emitter — the only mutator in the system
//!
//! Dataflow is one-way: the emitter validates, enriches, appends, and then
//! publishes the stored event to subscribers registered at startup
//! (notification dispatcher, cache invalidators). Subscribers observe; they
//! never call back into the emitter.
//!
//! Emission order (any failure aborts with no side effects):
//!
//! 1. duplicate-creation scan
//! 2. role authority
//! 3. lifecycle transition
//! 4. geo enrichment (creation events only)
//! 5. durable append
//! 6. publish to subscribers (post-append; failures there never roll back
//!    the append)

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::eventlog::{
    Event, EventCandidate, EventLog, EventLogError, EventLogResult,
};
use crate::geo::GeoResolver;
use crate::lifecycle::{
    validate_role_authority, validate_transition, ActorRole, EventType, LifecycleState,
};

/// Observes stored events after the append is durable.
///
/// Implementations must not fail the emit path; anything that can go wrong
/// internally is logged and swallowed on their side.
pub trait EventSubscriber: Send + Sync {
    /// Called once per stored event, in registration order.
    fn on_event(&self, event: &Event);
}

/// The single mutator
pub struct EventEmitter {
    log: Arc<EventLog>,
    geo: Arc<dyn GeoResolver>,
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventEmitter {
    /// Wire an emitter to the log and a geo resolver.
    pub fn new(log: Arc<EventLog>, geo: Arc<dyn GeoResolver>) -> Self {
        Self {
            log,
            geo,
            subscribers: Vec::new(),
        }
    }

    /// Register a subscriber. Registration happens at startup, before any
    /// emission.
    pub fn subscribe(&mut self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Emit a domain event.
    ///
    /// # Errors
    ///
    /// - `TOWER_EVENT_DUPLICATE_CREATION` for a second creation of the same id
    /// - `TOWER_EVENT_ROLE_UNAUTHORIZED` when the role may not emit this event
    /// - `TOWER_EVENT_INVALID_TRANSITION` when the lifecycle edge is missing
    /// - `TOWER_EVENT_STORAGE` (fatal) when the append cannot be persisted
    pub fn emit(
        &self,
        shipment_id: &str,
        current_state: LifecycleState,
        next_state: LifecycleState,
        event_type: EventType,
        actor_role: ActorRole,
        metadata: BTreeMap<String, Value>,
    ) -> EventLogResult<Event> {
        // 1. Idempotent creation
        if event_type == EventType::ShipmentCreated {
            let prior = self.log.read_by_shipment(shipment_id)?;
            if prior
                .iter()
                .any(|e| e.event_type == EventType::ShipmentCreated)
            {
                return Err(EventLogError::duplicate_creation(shipment_id));
            }
        }

        // 2. Role authority
        validate_role_authority(actor_role, current_state, event_type)?;

        // 3. Lifecycle edge (METADATA_UPDATED is same-state, checked by the log)
        if event_type != EventType::MetadataUpdated {
            validate_transition(current_state, next_state)?;
        }

        // 4. Geo enrichment, creation only
        let metadata = if event_type == EventType::ShipmentCreated {
            self.enrich_geo(metadata)
        } else {
            metadata
        };

        // 5. Durable append (the log re-validates against its own view)
        let event = self.log.append(EventCandidate {
            shipment_id: shipment_id.to_string(),
            event_type,
            previous_state: current_state,
            new_state: next_state,
            actor_role,
            metadata,
        })?;

        // 6. Publish. Subscriber trouble is the subscriber's problem.
        for subscriber in &self.subscribers {
            subscriber.on_event(&event);
        }

        Ok(event)
    }

    /// Merge resolved geo into creation metadata under stable keys.
    fn enrich_geo(&self, mut metadata: BTreeMap<String, Value>) -> BTreeMap<String, Value> {
        let source = metadata.get("source").and_then(Value::as_str).map(String::from);
        let destination = metadata
            .get("destination")
            .and_then(Value::as_str)
            .map(String::from);

        if let Some(resolved) = source.as_deref().and_then(|raw| self.geo.resolve(raw)) {
            if let Some(city) = resolved.city {
                metadata.insert("source_city".to_string(), Value::String(city));
            }
            metadata.insert("source_state".to_string(), Value::String(resolved.state));
            metadata.insert(
                "source_state_code".to_string(),
                Value::String(resolved.state_code),
            );
            if let Some(confidence) = serde_json::Number::from_f64(resolved.confidence) {
                metadata.insert(
                    "source_geo_confidence".to_string(),
                    Value::Number(confidence),
                );
            }
        }

        if let Some(resolved) = destination.as_deref().and_then(|raw| self.geo.resolve(raw)) {
            if let Some(city) = resolved.city {
                metadata.insert("destination_city".to_string(), Value::String(city));
            }
            metadata.insert(
                "destination_state".to_string(),
                Value::String(resolved.state),
            );
            metadata.insert(
                "destination_state_code".to_string(),
                Value::String(resolved.state_code),
            );
            if let Some(confidence) = serde_json::Number::from_f64(resolved.confidence) {
                metadata.insert(
                    "destination_geo_confidence".to_string(),
                    Value::Number(confidence),
                );
            }
        }

        metadata
    }
}
