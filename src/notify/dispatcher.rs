//! Event-driven notification dispatch
//!
//! The dispatcher subscribes to the emitter and maps stored events to
//! template emissions. It runs strictly after the append is durable, and
//! nothing that goes wrong here reaches the emitter: every failure is
//! logged and swallowed at the subscriber boundary.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::analytics::{history_risk_score, predict_sla_breach};
use crate::emitter::EventSubscriber;
use crate::eventlog::Event;
use crate::lifecycle::EventType;
use crate::observability::Logger;
use crate::projection::Projector;

use super::errors::{NotifyError, NotifyResult};
use super::store::{Notification, NotificationStore};
use super::templates::get_template;

/// SLA risk (percent) above which an acknowledgment counts as delayed
const DELAYED_ACK_THRESHOLD: f64 = 50.0;

/// Risk score above which a supervisor approval escalates
const ESCALATION_RISK_THRESHOLD: f64 = 70.0;

/// Maps events to notifications
pub struct NotificationDispatcher {
    store: Arc<NotificationStore>,
    projector: Arc<Projector>,
}

impl NotificationDispatcher {
    /// Wire a dispatcher to the store and a projector (for SLA inference).
    pub fn new(store: Arc<NotificationStore>, projector: Arc<Projector>) -> Self {
        Self { store, projector }
    }

    /// Build, persist, and return a notification from a template.
    ///
    /// # Errors
    ///
    /// `NotifyError::TemplateUnknown` for names outside the registry;
    /// store failures propagate.
    pub fn emit(
        &self,
        template_name: &str,
        shipment_id: &str,
        context: BTreeMap<String, String>,
        metadata: BTreeMap<String, Value>,
    ) -> NotifyResult<Notification> {
        let template = get_template(template_name)
            .ok_or_else(|| NotifyError::TemplateUnknown(template_name.to_string()))?;

        let notification = Notification {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            shipment_id: shipment_id.to_string(),
            template_name: template.name.to_string(),
            message: template.format(&context),
            severity: template.severity,
            recipients: template.recipient_roles.iter().copied().collect(),
            metadata,
            read_by: Default::default(),
        };

        self.store.append(&notification)?;
        Ok(notification)
    }

    /// Route one stored event to its template emissions.
    pub fn route_event(&self, event: &Event) -> NotifyResult<Vec<Notification>> {
        let mut emitted = Vec::new();
        let event_meta: BTreeMap<String, Value> = [(
            "event_type".to_string(),
            Value::String(event.event_type.as_str().to_string()),
        )]
        .into_iter()
        .collect();

        match event.event_type {
            EventType::ReceiverAcknowledged => {
                let row = self.projector.shipment(&event.shipment_id).ok().flatten();
                let destination_state = row
                    .as_ref()
                    .and_then(|r| r.destination_state.clone())
                    .unwrap_or_else(|| "Unknown".to_string());

                emitted.push(self.emit(
                    "RECEIVER_ACK_TO_SENDER",
                    &event.shipment_id,
                    [
                        ("shipment_id".to_string(), event.shipment_id.clone()),
                        ("destination_state".to_string(), destination_state),
                    ]
                    .into_iter()
                    .collect(),
                    event_meta.clone(),
                )?);

                // Late acknowledgment: infer SLA risk from the history
                if let Some(row) = row {
                    let sla_risk = predict_sla_breach(&row.history).breach_probability * 100.0;
                    if sla_risk > DELAYED_ACK_THRESHOLD {
                        emitted.push(self.emit(
                            "RECEIVER_ACK_DELAYED",
                            &event.shipment_id,
                            [
                                ("shipment_id".to_string(), event.shipment_id.clone()),
                                ("sla_risk".to_string(), format!("{:.0}", sla_risk)),
                            ]
                            .into_iter()
                            .collect(),
                            event_meta,
                        )?);
                    }
                }
            }

            EventType::Delivered => {
                emitted.push(self.emit(
                    "DELIVERY_CONFIRMED",
                    &event.shipment_id,
                    [
                        ("shipment_id".to_string(), event.shipment_id.clone()),
                        (
                            "delivery_time".to_string(),
                            event.timestamp.to_rfc3339(),
                        ),
                    ]
                    .into_iter()
                    .collect(),
                    event_meta,
                )?);
            }

            EventType::DeliveryFailed => {
                let failure_reason = event
                    .metadata
                    .get("failure_reason")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown")
                    .to_string();
                emitted.push(self.emit(
                    "DELIVERY_FAILED",
                    &event.shipment_id,
                    [
                        ("shipment_id".to_string(), event.shipment_id.clone()),
                        ("failure_reason".to_string(), failure_reason),
                    ]
                    .into_iter()
                    .collect(),
                    event_meta,
                )?);
            }

            EventType::SupervisorApproved => {
                let risk = self
                    .projector
                    .shipment(&event.shipment_id)
                    .ok()
                    .flatten()
                    .map(|row| history_risk_score(&row.history))
                    .unwrap_or(0.0);
                if risk > ESCALATION_RISK_THRESHOLD {
                    emitted.push(self.emit(
                        "SUPERVISOR_PRIORITY_ESCALATION",
                        &event.shipment_id,
                        [
                            ("shipment_id".to_string(), event.shipment_id.clone()),
                            ("risk_score".to_string(), format!("{:.0}", risk)),
                        ]
                        .into_iter()
                        .collect(),
                        event_meta,
                    )?);
                }
            }

            EventType::OutForDelivery => {
                let eta = event
                    .metadata
                    .get("eta")
                    .and_then(Value::as_str)
                    .unwrap_or("unavailable")
                    .to_string();
                emitted.push(self.emit(
                    "WAREHOUSE_OUT_FOR_DELIVERY",
                    &event.shipment_id,
                    [
                        ("shipment_id".to_string(), event.shipment_id.clone()),
                        ("eta".to_string(), eta),
                    ]
                    .into_iter()
                    .collect(),
                    event_meta,
                )?);
            }

            EventType::WarehouseIntake => {
                let priority = event
                    .metadata
                    .get("priority_level")
                    .and_then(Value::as_str)
                    .unwrap_or("NORMAL")
                    .to_string();
                emitted.push(self.emit(
                    "WAREHOUSE_INTAKE_READY",
                    &event.shipment_id,
                    [
                        ("shipment_id".to_string(), event.shipment_id.clone()),
                        ("priority_level".to_string(), priority),
                    ]
                    .into_iter()
                    .collect(),
                    event_meta,
                )?);
            }

            EventType::OverrideApplied => {
                let reason = event
                    .metadata
                    .get("override_reason")
                    .and_then(Value::as_str)
                    .unwrap_or("Not specified")
                    .to_string();
                emitted.push(self.emit(
                    "MANAGER_OVERRIDE_RECORDED",
                    &event.shipment_id,
                    [
                        ("shipment_id".to_string(), event.shipment_id.clone()),
                        ("override_reason".to_string(), reason),
                    ]
                    .into_iter()
                    .collect(),
                    event_meta,
                )?);
            }

            _ => {}
        }

        Ok(emitted)
    }
}

impl EventSubscriber for NotificationDispatcher {
    fn on_event(&self, event: &Event) {
        // The subscriber boundary: dispatch failures must never reach the
        // emitter.
        if let Err(e) = self.route_event(event) {
            Logger::warn(
                "NOTIFICATION_DISPATCH_FAILED",
                &[
                    ("shipment_id", event.shipment_id.as_str()),
                    ("event_type", event.event_type.as_str()),
                    ("error", &e.to_string()),
                ],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventlog::EventLog;
    use crate::lifecycle::{ActorRole, LifecycleState};
    use tempfile::TempDir;

    fn dispatcher(tmp: &TempDir) -> (NotificationDispatcher, Arc<NotificationStore>) {
        let log = Arc::new(EventLog::open(&tmp.path().join("logs")).unwrap());
        let projector = Arc::new(Projector::new(log));
        let store = Arc::new(NotificationStore::open(&tmp.path().join("notify")).unwrap());
        (
            NotificationDispatcher::new(Arc::clone(&store), projector),
            store,
        )
    }

    fn event(event_type: EventType, metadata: &[(&str, &str)]) -> Event {
        Event {
            event_id: Uuid::new_v4(),
            sequence: 3,
            timestamp: Utc::now(),
            shipment_id: "SHP-0000000001".to_string(),
            event_type,
            previous_state: LifecycleState::InTransit,
            new_state: LifecycleState::ReceiverAcknowledged,
            actor_role: ActorRole::ReceiverManager,
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect(),
        }
    }

    #[test]
    fn test_receiver_ack_routes_to_sender() {
        let tmp = TempDir::new().unwrap();
        let (dispatcher, store) = dispatcher(&tmp);
        let emitted = dispatcher
            .route_event(&event(EventType::ReceiverAcknowledged, &[]))
            .unwrap();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].template_name, "RECEIVER_ACK_TO_SENDER");
        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_delivery_failed_carries_reason() {
        let tmp = TempDir::new().unwrap();
        let (dispatcher, _) = dispatcher(&tmp);
        let emitted = dispatcher
            .route_event(&event(
                EventType::DeliveryFailed,
                &[("failure_reason", "Address unreachable")],
            ))
            .unwrap();
        assert_eq!(emitted.len(), 1);
        assert!(emitted[0].message.contains("Address unreachable"));
    }

    #[test]
    fn test_unrouted_event_types_are_quiet() {
        let tmp = TempDir::new().unwrap();
        let (dispatcher, store) = dispatcher(&tmp);
        let emitted = dispatcher
            .route_event(&event(EventType::ManagerApproved, &[]))
            .unwrap();
        assert!(emitted.is_empty());
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_template_errors_inside_boundary() {
        let tmp = TempDir::new().unwrap();
        let (dispatcher, _) = dispatcher(&tmp);
        let err = dispatcher
            .emit(
                "NOT_A_TEMPLATE",
                "SHP-0000000001",
                BTreeMap::new(),
                BTreeMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, NotifyError::TemplateUnknown(_)));
    }
}
