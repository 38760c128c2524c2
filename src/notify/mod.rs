//! Notification subsystem
//!
//! Event-triggered, template-based, role-routed, persisted.
//!
//! - Notifications are created only by the dispatcher routing stored events
//! - Immutable after creation except `read_by` (set-insert, recipients only)
//! - Dispatch failures never propagate to the emitter

mod dispatcher;
mod errors;
mod store;
mod templates;

pub use dispatcher::NotificationDispatcher;
pub use errors::{NotifyError, NotifyResult};
pub use store::{Notification, NotificationStore, SeverityCounts};
pub use templates::{get_template, NotificationSeverity, NotificationTemplate, TEMPLATES};
