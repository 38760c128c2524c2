//! Notification templates
//!
//! Centralized, immutable message templates with severity and role routing.
//! The registry is the only way to reach a template; event handlers refer
//! to templates by name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lifecycle::ActorRole;

/// Notification severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationSeverity {
    /// Routine progress
    Info,
    /// Needs attention soon
    Warning,
    /// Needs attention now
    Urgent,
    /// Operational incident
    Critical,
}

impl NotificationSeverity {
    /// Stable string token
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationSeverity::Info => "INFO",
            NotificationSeverity::Warning => "WARNING",
            NotificationSeverity::Urgent => "URGENT",
            NotificationSeverity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for NotificationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable notification template
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotificationTemplate {
    /// Registry name
    pub name: &'static str,
    /// Message with `{placeholder}` slots
    pub message_template: &'static str,
    /// Severity of every notification built from this template
    pub severity: NotificationSeverity,
    /// Roles that receive it
    pub recipient_roles: &'static [ActorRole],
}

impl NotificationTemplate {
    /// Fill `{placeholder}` slots from the context map. Unknown
    /// placeholders are left verbatim so a missing key is visible, not
    /// silent.
    pub fn format(&self, context: &BTreeMap<String, String>) -> String {
        let mut message = self.message_template.to_string();
        for (key, value) in context {
            message = message.replace(&format!("{{{}}}", key), value);
        }
        message
    }
}

use crate::lifecycle::ActorRole::{
    Coo, ReceiverManager, Regulator, SenderManager, SenderSupervisor, System, WarehouseManager,
};

/// The template registry
pub const TEMPLATES: &[NotificationTemplate] = &[
    NotificationTemplate {
        name: "RECEIVER_ACK_TO_SENDER",
        message_template:
            "Shipment {shipment_id} has reached the receiver manager in {destination_state}.",
        severity: NotificationSeverity::Info,
        recipient_roles: &[SenderManager, SenderSupervisor],
    },
    NotificationTemplate {
        name: "RECEIVER_ACK_DELAYED",
        message_template:
            "Shipment {shipment_id} acknowledged late. SLA risk increased to {sla_risk}%.",
        severity: NotificationSeverity::Warning,
        recipient_roles: &[SenderManager, SenderSupervisor, Coo],
    },
    NotificationTemplate {
        name: "DELIVERY_CONFIRMED",
        message_template:
            "Shipment {shipment_id} successfully delivered to the customer at {delivery_time}.",
        severity: NotificationSeverity::Info,
        recipient_roles: &[WarehouseManager, ReceiverManager, SenderManager],
    },
    NotificationTemplate {
        name: "DELIVERY_FAILED",
        message_template:
            "Delivery attempt failed for {shipment_id}. Reason: {failure_reason}.",
        severity: NotificationSeverity::Urgent,
        recipient_roles: &[WarehouseManager, ReceiverManager, Coo],
    },
    NotificationTemplate {
        name: "SUPERVISOR_PRIORITY_ESCALATION",
        message_template:
            "High-priority shipment {shipment_id} approved. Risk score: {risk_score}. Will be dispatched first.",
        severity: NotificationSeverity::Urgent,
        recipient_roles: &[SenderManager, Coo],
    },
    NotificationTemplate {
        name: "SLA_BREACH_WARNING",
        message_template:
            "Shipment {shipment_id} at risk of SLA breach. Current probability: {breach_probability}%.",
        severity: NotificationSeverity::Warning,
        recipient_roles: &[SenderManager, ReceiverManager, Coo],
    },
    NotificationTemplate {
        name: "WAREHOUSE_INTAKE_READY",
        message_template:
            "Shipment {shipment_id} ready for warehouse intake. Priority: {priority_level}.",
        severity: NotificationSeverity::Info,
        recipient_roles: &[WarehouseManager],
    },
    NotificationTemplate {
        name: "WAREHOUSE_OUT_FOR_DELIVERY",
        message_template: "Shipment {shipment_id} out for delivery. ETA: {eta}.",
        severity: NotificationSeverity::Info,
        recipient_roles: &[ReceiverManager, SenderManager],
    },
    NotificationTemplate {
        name: "HIGH_RISK_ALERT",
        message_template:
            "High fused risk for {shipment_id}. Weather: {weather_risk}, Corridor: {corridor_risk}, ETA: {eta_risk}.",
        severity: NotificationSeverity::Warning,
        recipient_roles: &[SenderManager, SenderSupervisor],
    },
    NotificationTemplate {
        name: "MANAGER_OVERRIDE_RECORDED",
        message_template:
            "Manager override recorded for {shipment_id}. Reason: {override_reason}.",
        severity: NotificationSeverity::Info,
        recipient_roles: &[Coo, System],
    },
    NotificationTemplate {
        name: "OVERRIDE_AUDIT_ALERT",
        message_template:
            "Override audit required for {shipment_id}. Override count: {override_count} in the last 24h.",
        severity: NotificationSeverity::Warning,
        recipient_roles: &[Coo, Regulator],
    },
    NotificationTemplate {
        name: "DAILY_METRICS_ROLLUP",
        message_template:
            "Daily metrics rollup completed. Date: {date}. Total shipments: {total_shipments}.",
        severity: NotificationSeverity::Info,
        recipient_roles: &[Coo, System],
    },
    NotificationTemplate {
        name: "SNAPSHOT_INTEGRITY_ALERT",
        message_template:
            "Snapshot integrity verification complete. Status: {status}. Issues: {issue_count}.",
        severity: NotificationSeverity::Critical,
        recipient_roles: &[System, Coo, Regulator],
    },
];

/// Look up a template by registry name.
pub fn get_template(name: &str) -> Option<&'static NotificationTemplate> {
    TEMPLATES.iter().find(|t| t.name == name)
}
