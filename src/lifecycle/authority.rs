//! Role-authority table
//!
//! Who may emit which event types, refined by the state the shipment is in
//! at the time of emission. Pure table lookup; the emitter rejects any
//! mismatch before touching the log.

use super::roles::ActorRole;
use super::{EventType, LifecycleError, LifecycleResult, LifecycleState};

/// Roles authorized to emit a given event type.
fn authorized_roles(event_type: EventType) -> &'static [ActorRole] {
    use ActorRole::*;
    match event_type {
        EventType::ShipmentCreated => &[Sender, SenderManager, System],
        EventType::MetadataUpdated => &[Sender, SenderManager, System],
        EventType::ManagerApproved => &[SenderManager, System],
        EventType::ManagerOnHold => &[SenderManager],
        EventType::HoldForReview => &[SenderManager, SenderSupervisor, Coo, System],
        EventType::OverrideApplied => &[SenderManager, Coo],
        EventType::HoldReleased => &[SenderManager, Coo, System],
        EventType::SupervisorApproved => &[SenderSupervisor],
        EventType::InTransit => &[Carrier, System],
        EventType::ReceiverAcknowledged => &[ReceiverManager],
        EventType::WarehouseIntake => &[WarehouseManager],
        EventType::OutForDelivery => &[WarehouseManager],
        EventType::DeliveryFailed => &[Carrier, WarehouseManager],
        EventType::Delivered => &[Carrier, ReceiverManager],
        EventType::Cancelled => &[Sender, SenderManager, Coo, System],
        EventType::LifecycleClosed => &[Coo, System],
    }
}

/// Validate that `role` may emit `event_type` while the shipment sits in
/// `current_state`.
///
/// One state-sensitive refinement: a plain SENDER may cancel only a
/// shipment that is still in `CREATED` (once a manager has touched it, the
/// sender is out of the loop).
///
/// # Errors
///
/// Returns `LifecycleError::RoleUnauthorized` on any mismatch.
pub fn validate_role_authority(
    role: ActorRole,
    current_state: LifecycleState,
    event_type: EventType,
) -> LifecycleResult<()> {
    let unauthorized = || LifecycleError::RoleUnauthorized {
        role,
        event_type,
        state: current_state,
    };

    if !authorized_roles(event_type).contains(&role) {
        return Err(unauthorized());
    }

    if event_type == EventType::Cancelled
        && role == ActorRole::Sender
        && current_state != LifecycleState::Created
    {
        return Err(unauthorized());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_cannot_approve() {
        let err = validate_role_authority(
            ActorRole::Sender,
            LifecycleState::ManagerOnHold,
            EventType::ManagerApproved,
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::RoleUnauthorized { .. }));
    }

    #[test]
    fn test_sender_manager_can_approve_from_hold() {
        assert!(validate_role_authority(
            ActorRole::SenderManager,
            LifecycleState::ManagerOnHold,
            EventType::ManagerApproved,
        )
        .is_ok());
    }

    #[test]
    fn test_sender_cancel_only_from_created() {
        assert!(validate_role_authority(
            ActorRole::Sender,
            LifecycleState::Created,
            EventType::Cancelled,
        )
        .is_ok());
        assert!(validate_role_authority(
            ActorRole::Sender,
            LifecycleState::InTransit,
            EventType::Cancelled,
        )
        .is_err());
    }

    #[test]
    fn test_regulator_can_emit_nothing() {
        use EventType::*;
        for event_type in [
            ShipmentCreated,
            ManagerApproved,
            SupervisorApproved,
            InTransit,
            Delivered,
            Cancelled,
            MetadataUpdated,
        ] {
            assert!(validate_role_authority(
                ActorRole::Regulator,
                LifecycleState::Created,
                event_type,
            )
            .is_err());
        }
    }

    #[test]
    fn test_override_limited_to_manager_and_coo() {
        assert!(validate_role_authority(
            ActorRole::Coo,
            LifecycleState::HoldForReview,
            EventType::OverrideApplied,
        )
        .is_ok());
        assert!(validate_role_authority(
            ActorRole::SenderSupervisor,
            LifecycleState::HoldForReview,
            EventType::OverrideApplied,
        )
        .is_err());
    }
}
