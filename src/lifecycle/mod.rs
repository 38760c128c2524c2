//! Shipment lifecycle policy
//!
//! Declarative tables only; no I/O, no clocks. The transition table below is
//! the single source of truth for which lifecycle edges exist. Everything
//! that mutates state goes through `emitter`, which consults these
//! validators before any append.
//!
//! Terminal states: `CANCELLED`, `LIFECYCLE_CLOSED`.

mod authority;
mod roles;

pub use authority::validate_role_authority;
pub use roles::{AccessScope, ActorRole};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for lifecycle validation
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Lifecycle validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The current state is not a lifecycle node
    #[error("Unknown current state: {state}")]
    UnknownCurrentState {
        /// Raw state token
        state: String,
    },

    /// The edge `from -> to` does not exist in the transition table
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current lifecycle state
        from: LifecycleState,
        /// Requested next state
        to: LifecycleState,
    },

    /// The acting role may not emit this event from this state
    #[error("Role {role} is not authorized to emit {event_type} from {state}")]
    RoleUnauthorized {
        /// Acting role
        role: ActorRole,
        /// Attempted event type
        event_type: EventType,
        /// Lifecycle state at the time of the attempt
        state: LifecycleState,
    },
}

/// Lifecycle states (nodes of the transition graph)
///
/// `None` is the virtual initial state carried by the first event's
/// `previous_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// Virtual initial state; only ever a `previous_state`
    None,
    /// Shipment registered by the sender
    Created,
    /// Approved by the sender-side manager
    ManagerApproved,
    /// Parked by the sender-side manager
    ManagerOnHold,
    /// Flagged for compliance review
    HoldForReview,
    /// Manager override recorded during review
    OverrideApplied,
    /// Approved by the sender-side supervisor
    SupervisorApproved,
    /// Moving through the corridor
    InTransit,
    /// Acknowledged at the destination
    ReceiverAcknowledged,
    /// Accepted into the destination warehouse
    WarehouseIntake,
    /// On the last-mile vehicle
    OutForDelivery,
    /// Last-mile attempt failed
    DeliveryFailed,
    /// Delivered to the customer
    Delivered,
    /// Terminal: cancelled
    Cancelled,
    /// Terminal: closed after delivery
    LifecycleClosed,
}

impl LifecycleState {
    /// Stable string token used on the wire and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::None => "NONE",
            LifecycleState::Created => "CREATED",
            LifecycleState::ManagerApproved => "MANAGER_APPROVED",
            LifecycleState::ManagerOnHold => "MANAGER_ON_HOLD",
            LifecycleState::HoldForReview => "HOLD_FOR_REVIEW",
            LifecycleState::OverrideApplied => "OVERRIDE_APPLIED",
            LifecycleState::SupervisorApproved => "SUPERVISOR_APPROVED",
            LifecycleState::InTransit => "IN_TRANSIT",
            LifecycleState::ReceiverAcknowledged => "RECEIVER_ACKNOWLEDGED",
            LifecycleState::WarehouseIntake => "WAREHOUSE_INTAKE",
            LifecycleState::OutForDelivery => "OUT_FOR_DELIVERY",
            LifecycleState::DeliveryFailed => "DELIVERY_FAILED",
            LifecycleState::Delivered => "DELIVERED",
            LifecycleState::Cancelled => "CANCELLED",
            LifecycleState::LifecycleClosed => "LIFECYCLE_CLOSED",
        }
    }

    /// True for states with no outgoing edges
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Cancelled | LifecycleState::LifecycleClosed)
    }

    /// Allowed successor states
    pub fn successors(&self) -> &'static [LifecycleState] {
        use LifecycleState::*;
        match self {
            None => &[Created],
            Created => &[ManagerApproved, ManagerOnHold, HoldForReview, Cancelled],
            ManagerOnHold => &[ManagerApproved, Created, Cancelled],
            HoldForReview => &[ManagerApproved, Created, OverrideApplied, Cancelled],
            // Override is a proper node: it can resolve the review in any
            // direction except straight to supervisor approval.
            OverrideApplied => &[ManagerApproved, HoldForReview, Cancelled, Created],
            ManagerApproved => &[SupervisorApproved, HoldForReview, Cancelled],
            SupervisorApproved => &[InTransit, HoldForReview, Cancelled],
            InTransit => &[ReceiverAcknowledged, HoldForReview, Cancelled],
            ReceiverAcknowledged => &[WarehouseIntake, HoldForReview],
            WarehouseIntake => &[OutForDelivery, HoldForReview],
            OutForDelivery => &[DeliveryFailed, Delivered, HoldForReview, Cancelled],
            DeliveryFailed => &[OutForDelivery, Cancelled],
            Delivered => &[LifecycleClosed],
            Cancelled => &[],
            LifecycleClosed => &[],
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain event types
///
/// Most event types are named after the state they establish. The two
/// exceptions are `SHIPMENT_CREATED` (the mandatory first event) and
/// `METADATA_UPDATED` (no lifecycle effect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// First event of every shipment
    ShipmentCreated,
    /// Sender-side manager approval
    ManagerApproved,
    /// Sender-side manager hold
    ManagerOnHold,
    /// Compliance review hold
    HoldForReview,
    /// Manager override during review
    OverrideApplied,
    /// Hold or override released back to `CREATED`
    HoldReleased,
    /// Sender-side supervisor approval
    SupervisorApproved,
    /// Carrier pickup
    InTransit,
    /// Destination acknowledgment
    ReceiverAcknowledged,
    /// Warehouse intake
    WarehouseIntake,
    /// Last-mile dispatch
    OutForDelivery,
    /// Last-mile failure
    DeliveryFailed,
    /// Customer delivery
    Delivered,
    /// Cancellation
    Cancelled,
    /// Post-delivery closure
    LifecycleClosed,
    /// Source/destination string correction; carries no state change
    MetadataUpdated,
}

impl EventType {
    /// Stable string token used on the wire and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ShipmentCreated => "SHIPMENT_CREATED",
            EventType::ManagerApproved => "MANAGER_APPROVED",
            EventType::ManagerOnHold => "MANAGER_ON_HOLD",
            EventType::HoldForReview => "HOLD_FOR_REVIEW",
            EventType::OverrideApplied => "OVERRIDE_APPLIED",
            EventType::HoldReleased => "HOLD_RELEASED",
            EventType::SupervisorApproved => "SUPERVISOR_APPROVED",
            EventType::InTransit => "IN_TRANSIT",
            EventType::ReceiverAcknowledged => "RECEIVER_ACKNOWLEDGED",
            EventType::WarehouseIntake => "WAREHOUSE_INTAKE",
            EventType::OutForDelivery => "OUT_FOR_DELIVERY",
            EventType::DeliveryFailed => "DELIVERY_FAILED",
            EventType::Delivered => "DELIVERED",
            EventType::Cancelled => "CANCELLED",
            EventType::LifecycleClosed => "LIFECYCLE_CLOSED",
            EventType::MetadataUpdated => "METADATA_UPDATED",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate a lifecycle transition against the table.
///
/// Total over all state pairs; terminal states simply have no successors.
///
/// # Errors
///
/// Returns `LifecycleError::InvalidTransition` if the edge does not exist.
pub fn validate_transition(from: LifecycleState, to: LifecycleState) -> LifecycleResult<()> {
    if from.successors().contains(&to) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_transition_is_creation_only() {
        assert!(validate_transition(LifecycleState::None, LifecycleState::Created).is_ok());
        assert!(validate_transition(LifecycleState::None, LifecycleState::InTransit).is_err());
    }

    #[test]
    fn test_terminal_states_have_no_successors() {
        assert!(LifecycleState::Cancelled.successors().is_empty());
        assert!(LifecycleState::LifecycleClosed.successors().is_empty());
        assert!(
            validate_transition(LifecycleState::Cancelled, LifecycleState::Created).is_err()
        );
    }

    #[test]
    fn test_created_cannot_skip_to_delivery() {
        let err =
            validate_transition(LifecycleState::Created, LifecycleState::OutForDelivery)
                .unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: LifecycleState::Created,
                to: LifecycleState::OutForDelivery,
            }
        );
    }

    #[test]
    fn test_failed_delivery_can_retry() {
        assert!(validate_transition(
            LifecycleState::DeliveryFailed,
            LifecycleState::OutForDelivery
        )
        .is_ok());
    }

    #[test]
    fn test_override_reachable_only_from_review() {
        for from in [
            LifecycleState::Created,
            LifecycleState::ManagerApproved,
            LifecycleState::InTransit,
        ] {
            assert!(validate_transition(from, LifecycleState::OverrideApplied).is_err());
        }
        assert!(validate_transition(
            LifecycleState::HoldForReview,
            LifecycleState::OverrideApplied
        )
        .is_ok());
    }

    #[test]
    fn test_tokens_round_trip_through_serde() {
        for state in [
            LifecycleState::None,
            LifecycleState::ReceiverAcknowledged,
            LifecycleState::LifecycleClosed,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.as_str()));
            let back: LifecycleState = serde_json::from_str(&json).unwrap();
            assert_eq!(back, state);
        }
    }
}
