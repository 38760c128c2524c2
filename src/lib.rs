//! controltower - an event-sourced logistics control tower
//!
//! Every operational fact lives in a single append-only event log. Read
//! models, SLA and corridor analytics, notifications, and the signed
//! compliance snapshots are all derived from it by deterministic replay.
//!
//! Subsystem map:
//! - `eventlog`: the single source of truth (append-only, sequenced, durable)
//! - `lifecycle`: declarative transition / role-authority / scope tables
//! - `emitter`: the only mutator; validates, enriches, appends, publishes
//! - `projection`: deterministic replay into shipment read models
//! - `access`: Geo-RBAC decisions with structured denial reasons
//! - `analytics`: SLA breach, corridor risk fusion, heatmap aggregation
//! - `snapshot`: hashed + HMAC-signed + chain-linked read-model freezes
//! - `integrity`: tamper detection over snapshots and the chain
//! - `forensics`: snapshot-only replay, timelines, evidence bundles
//! - `notify`: event-driven, template-based, role-routed notifications
//! - `regulator`: snapshot-only surface, fail-closed policy guard
//! - `external`: weather / routing / email collaborators behind traits

pub mod access;
pub mod analytics;
pub mod cli;
pub mod config;
pub mod emitter;
pub mod eventlog;
pub mod external;
pub mod forensics;
pub mod geo;
pub mod integrity;
pub mod lifecycle;
pub mod notify;
pub mod observability;
pub mod projection;
pub mod regulator;
pub mod snapshot;
