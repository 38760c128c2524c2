//! Event log subsystem
//!
//! The single source of truth. Everything else in the crate is a derivation
//! of this log: read models are rebuilt from it, snapshots freeze those read
//! models, and forensics consumes only the snapshots.
//!
//! # Design principles
//!
//! - Append-only, never truncated
//! - Single serialized writer; fsync before acknowledge
//! - Validation before persistence; no side effects on rejection
//! - Ordering: per-shipment total order by `sequence`; across shipments
//!   only append order

mod errors;
mod ids;
mod log;
mod record;

pub use errors::{EventLogError, EventLogErrorCode, EventLogResult, Severity};
pub use ids::{format_shipment_id, is_valid_shipment_id, ShipmentIdGenerator};
pub use log::{AuditReport, EventCache, EventLog, IntegrityReport};
pub use record::{Event, EventCandidate, ShipmentId};
