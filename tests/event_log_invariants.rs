//! Event Log Invariant Tests
//!
//! Tests for invariants:
//! - E1: Per-shipment sequences are 1..k with no gaps
//! - E2: Timestamps are non-decreasing within a shipment
//! - E3: The first event of a shipment is SHIPMENT_CREATED
//! - E4: A rejected append leaves the log unchanged
//! - E5: Appends are durable across reopen
//!
//! The log is append-only, fsynced before acknowledge, and validated
//! before persistence.

use std::collections::BTreeMap;
use std::sync::Arc;

use controltower::emitter::EventEmitter;
use controltower::eventlog::{EventLog, EventLogErrorCode, ShipmentIdGenerator};
use controltower::geo::StaticGeoResolver;
use controltower::lifecycle::{ActorRole, EventType, LifecycleState};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn open_emitter(log: &Arc<EventLog>) -> EventEmitter {
    EventEmitter::new(Arc::clone(log), Arc::new(StaticGeoResolver))
}

fn creation_metadata() -> BTreeMap<String, Value> {
    [
        ("source".to_string(), json!("Mumbai")),
        ("destination".to_string(), json!("Ahmedabad")),
    ]
    .into_iter()
    .collect()
}

fn create_shipment(emitter: &EventEmitter, id: &str) {
    emitter
        .emit(
            id,
            LifecycleState::None,
            LifecycleState::Created,
            EventType::ShipmentCreated,
            ActorRole::Sender,
            creation_metadata(),
        )
        .unwrap();
}

// =============================================================================
// INVARIANT E1/E2: Sequences and timestamps
// =============================================================================

/// E1: sequences are gapless and start at 1.
#[test]
fn test_e1_sequences_are_gapless() {
    let tmp = TempDir::new().unwrap();
    let log = Arc::new(EventLog::open(tmp.path()).unwrap());
    let emitter = open_emitter(&log);

    create_shipment(&emitter, "SHP-0000000001");
    emitter
        .emit(
            "SHP-0000000001",
            LifecycleState::Created,
            LifecycleState::ManagerApproved,
            EventType::ManagerApproved,
            ActorRole::SenderManager,
            BTreeMap::new(),
        )
        .unwrap();
    emitter
        .emit(
            "SHP-0000000001",
            LifecycleState::ManagerApproved,
            LifecycleState::SupervisorApproved,
            EventType::SupervisorApproved,
            ActorRole::SenderSupervisor,
            BTreeMap::new(),
        )
        .unwrap();

    let events = log.read_by_shipment("SHP-0000000001").unwrap();
    let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);

    let report = log.verify_integrity().unwrap();
    assert!(report.valid, "unexpected errors: {:?}", report.errors);
}

/// E2: timestamps never decrease within a shipment.
#[test]
fn test_e2_timestamps_non_decreasing() {
    let tmp = TempDir::new().unwrap();
    let log = Arc::new(EventLog::open(tmp.path()).unwrap());
    let emitter = open_emitter(&log);

    create_shipment(&emitter, "SHP-0000000001");
    emitter
        .emit(
            "SHP-0000000001",
            LifecycleState::Created,
            LifecycleState::HoldForReview,
            EventType::HoldForReview,
            ActorRole::SenderManager,
            BTreeMap::new(),
        )
        .unwrap();

    let events = log.read_by_shipment("SHP-0000000001").unwrap();
    for pair in events.windows(2) {
        assert!(pair[1].timestamp >= pair[0].timestamp);
    }
}

// =============================================================================
// INVARIANT E3/E4: Validation rejects bad appends with no side effects
// =============================================================================

/// Duplicate creation is rejected and the log grows by exactly one.
#[test]
fn test_e4_duplicate_creation_blocked() {
    let tmp = TempDir::new().unwrap();
    let log = Arc::new(EventLog::open(tmp.path()).unwrap());
    let emitter = open_emitter(&log);

    create_shipment(&emitter, "SHP-0000000001");
    let before = log.read_all().unwrap().events.len();

    let err = emitter
        .emit(
            "SHP-0000000001",
            LifecycleState::None,
            LifecycleState::Created,
            EventType::ShipmentCreated,
            ActorRole::Sender,
            creation_metadata(),
        )
        .unwrap_err();
    assert_eq!(err.code(), EventLogErrorCode::TowerEventDuplicateCreation);

    assert_eq!(log.read_all().unwrap().events.len(), before);
    assert_eq!(before, 1);
}

/// E3: a first event that is not SHIPMENT_CREATED is rejected.
#[test]
fn test_e3_first_event_must_be_creation() {
    let tmp = TempDir::new().unwrap();
    let log = Arc::new(EventLog::open(tmp.path()).unwrap());
    let emitter = open_emitter(&log);

    let err = emitter
        .emit(
            "SHP-0000000009",
            LifecycleState::None,
            LifecycleState::Created,
            EventType::ManagerApproved,
            ActorRole::SenderManager,
            BTreeMap::new(),
        )
        .unwrap_err();
    // No prior events: nothing but creation can open a shipment
    assert!(matches!(
        err.code(),
        EventLogErrorCode::TowerEventInvalidTransition
    ));
    assert!(log.read_all().unwrap().events.is_empty());
}

/// Invalid transition: CREATED cannot jump to OUT_FOR_DELIVERY.
#[test]
fn test_e4_invalid_transition_rejected() {
    let tmp = TempDir::new().unwrap();
    let log = Arc::new(EventLog::open(tmp.path()).unwrap());
    let emitter = open_emitter(&log);

    create_shipment(&emitter, "SHP-0000000001");
    let err = emitter
        .emit(
            "SHP-0000000001",
            LifecycleState::Created,
            LifecycleState::OutForDelivery,
            EventType::OutForDelivery,
            ActorRole::WarehouseManager,
            BTreeMap::new(),
        )
        .unwrap_err();
    assert_eq!(err.code(), EventLogErrorCode::TowerEventInvalidTransition);

    // State unchanged
    let events = log.read_by_shipment("SHP-0000000001").unwrap();
    assert_eq!(events.last().unwrap().new_state, LifecycleState::Created);
}

/// Role authority: a SENDER cannot emit a manager approval, the manager can.
#[test]
fn test_e4_role_authority_enforced() {
    let tmp = TempDir::new().unwrap();
    let log = Arc::new(EventLog::open(tmp.path()).unwrap());
    let emitter = open_emitter(&log);

    create_shipment(&emitter, "SHP-0000000001");
    emitter
        .emit(
            "SHP-0000000001",
            LifecycleState::Created,
            LifecycleState::ManagerOnHold,
            EventType::ManagerOnHold,
            ActorRole::SenderManager,
            BTreeMap::new(),
        )
        .unwrap();

    let err = emitter
        .emit(
            "SHP-0000000001",
            LifecycleState::ManagerOnHold,
            LifecycleState::ManagerApproved,
            EventType::ManagerApproved,
            ActorRole::Sender,
            BTreeMap::new(),
        )
        .unwrap_err();
    assert_eq!(err.code(), EventLogErrorCode::TowerEventRoleUnauthorized);

    emitter
        .emit(
            "SHP-0000000001",
            LifecycleState::ManagerOnHold,
            LifecycleState::ManagerApproved,
            EventType::ManagerApproved,
            ActorRole::SenderManager,
            BTreeMap::new(),
        )
        .unwrap();
}

/// A caller with a stale view of the current state is rejected.
#[test]
fn test_e4_stale_state_claim_rejected() {
    let tmp = TempDir::new().unwrap();
    let log = Arc::new(EventLog::open(tmp.path()).unwrap());
    let emitter = open_emitter(&log);

    create_shipment(&emitter, "SHP-0000000001");
    emitter
        .emit(
            "SHP-0000000001",
            LifecycleState::Created,
            LifecycleState::ManagerApproved,
            EventType::ManagerApproved,
            ActorRole::SenderManager,
            BTreeMap::new(),
        )
        .unwrap();

    // Claims CREATED but the log says MANAGER_APPROVED
    let err = emitter
        .emit(
            "SHP-0000000001",
            LifecycleState::Created,
            LifecycleState::HoldForReview,
            EventType::HoldForReview,
            ActorRole::SenderManager,
            BTreeMap::new(),
        )
        .unwrap_err();
    assert_eq!(err.code(), EventLogErrorCode::TowerEventUnknownState);
}

// =============================================================================
// INVARIANT E5: Durability across reopen
// =============================================================================

#[test]
fn test_e5_events_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    {
        let log = Arc::new(EventLog::open(tmp.path()).unwrap());
        let emitter = open_emitter(&log);
        create_shipment(&emitter, "SHP-0000000001");
        create_shipment(&emitter, "SHP-0000000002");
    }

    let log = EventLog::open(tmp.path()).unwrap();
    assert_eq!(
        log.list_shipment_ids().unwrap(),
        vec!["SHP-0000000001".to_string(), "SHP-0000000002".to_string()]
    );
    let report = log.verify_integrity().unwrap();
    assert!(report.valid);
}

/// Shipment id counter is durable and append-only across reopen.
#[test]
fn test_e5_id_counter_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    {
        let ids = ShipmentIdGenerator::open(tmp.path()).unwrap();
        assert_eq!(ids.next_id().unwrap(), "SHP-0000000001");
        assert_eq!(ids.next_id().unwrap(), "SHP-0000000002");
    }
    let ids = ShipmentIdGenerator::open(tmp.path()).unwrap();
    assert_eq!(ids.next_id().unwrap(), "SHP-0000000003");
}

// =============================================================================
// Audit report
// =============================================================================

#[test]
fn test_audit_report_distributions() {
    let tmp = TempDir::new().unwrap();
    let log = Arc::new(EventLog::open(tmp.path()).unwrap());
    let emitter = open_emitter(&log);

    create_shipment(&emitter, "SHP-0000000001");
    create_shipment(&emitter, "SHP-0000000002");
    emitter
        .emit(
            "SHP-0000000001",
            LifecycleState::Created,
            LifecycleState::Cancelled,
            EventType::Cancelled,
            ActorRole::Sender,
            BTreeMap::new(),
        )
        .unwrap();

    let report = log.audit_report().unwrap();
    assert_eq!(report.total_events, 3);
    assert_eq!(report.total_shipments, 2);
    assert_eq!(report.event_type_distribution["SHIPMENT_CREATED"], 2);
    assert_eq!(report.state_distribution["CANCELLED"], 1);
    assert_eq!(report.state_distribution["CREATED"], 1);
    assert!(report.integrity.valid);
    assert!(report.first_event_time.is_some());
}
