//! Notification storage
//!
//! Append-only JSONL file, one notification per line. A notification is
//! immutable after creation except for `read_by`, which grows by set-insert
//! under the store lock (read-modify-write, atomic rewrite).

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::eventlog::ShipmentId;
use crate::lifecycle::ActorRole;

use super::errors::{NotifyError, NotifyResult};
use super::templates::NotificationSeverity;

const NOTIFICATIONS_FILE: &str = "notifications.jsonl";

/// A persisted notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Generated id
    pub id: Uuid,
    /// Creation wall-clock time
    pub timestamp: DateTime<Utc>,
    /// Related shipment (or `SYSTEM` for system-wide notices)
    pub shipment_id: ShipmentId,
    /// Template this was built from
    pub template_name: String,
    /// Formatted message
    pub message: String,
    /// Severity inherited from the template
    pub severity: NotificationSeverity,
    /// Roles this notification is routed to
    pub recipients: BTreeSet<ActorRole>,
    /// Extra context
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Roles that marked it read (set-insert only)
    #[serde(default)]
    pub read_by: BTreeSet<ActorRole>,
}

/// Severity counts for a role's inbox
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    /// INFO notifications
    pub info: usize,
    /// WARNING notifications
    pub warning: usize,
    /// URGENT notifications
    pub urgent: usize,
    /// CRITICAL notifications
    pub critical: usize,
}

/// Append-only notification store
pub struct NotificationStore {
    path: PathBuf,
    // Guards appends and the mark-read rewrite
    lock: Mutex<()>,
}

impl NotificationStore {
    /// Open (or create) the store under `dir`.
    pub fn open(dir: &Path) -> NotifyResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(NOTIFICATIONS_FILE),
            lock: Mutex::new(()),
        })
    }

    /// Append one notification durably.
    pub fn append(&self, notification: &Notification) -> NotifyResult<()> {
        let _guard = self.lock.lock().map_err(|_| NotifyError::LockPoisoned)?;
        let line = serde_json::to_string(notification)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        Ok(())
    }

    /// All notifications, oldest first.
    pub fn read_all(&self) -> NotifyResult<Vec<Notification>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut notifications = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            notifications.push(serde_json::from_str(line)?);
        }
        Ok(notifications)
    }

    /// Notifications routed to `role`, newest first.
    pub fn for_role(&self, role: ActorRole, unread_only: bool) -> NotifyResult<Vec<Notification>> {
        let mut notifications: Vec<_> = self
            .read_all()?
            .into_iter()
            .filter(|n| n.recipients.contains(&role))
            .filter(|n| !unread_only || !n.read_by.contains(&role))
            .collect();
        notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(notifications)
    }

    /// Notifications about one shipment, oldest first.
    pub fn for_shipment(&self, shipment_id: &str) -> NotifyResult<Vec<Notification>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|n| n.shipment_id == shipment_id)
            .collect())
    }

    /// Unread severity counts for a role's inbox.
    pub fn counts_by_severity(&self, role: ActorRole) -> NotifyResult<SeverityCounts> {
        let mut counts = SeverityCounts::default();
        for notification in self.for_role(role, true)? {
            match notification.severity {
                NotificationSeverity::Info => counts.info += 1,
                NotificationSeverity::Warning => counts.warning += 1,
                NotificationSeverity::Urgent => counts.urgent += 1,
                NotificationSeverity::Critical => counts.critical += 1,
            }
        }
        Ok(counts)
    }

    /// Mark a notification read by `role`.
    ///
    /// Idempotent (a second mark is a no-op) and authorized: only roles in
    /// `recipients` may mark.
    ///
    /// # Errors
    ///
    /// - `NotifyError::NotFound` when the id does not exist
    /// - `NotifyError::NotARecipient` when the role is not routed to it
    pub fn mark_read(&self, id: Uuid, role: ActorRole) -> NotifyResult<()> {
        let _guard = self.lock.lock().map_err(|_| NotifyError::LockPoisoned)?;

        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(NotifyError::NotFound(id))
            }
            Err(e) => return Err(e.into()),
        };

        let mut found = false;
        let mut changed = false;
        let mut lines = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let mut notification: Notification = serde_json::from_str(line)?;
            if notification.id == id {
                found = true;
                if !notification.recipients.contains(&role) {
                    return Err(NotifyError::NotARecipient {
                        id,
                        role: role.as_str(),
                    });
                }
                changed = notification.read_by.insert(role);
            }
            lines.push(serde_json::to_string(&notification)?);
        }

        if !found {
            return Err(NotifyError::NotFound(id));
        }
        if !changed {
            return Ok(());
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, lines.join("\n") + "\n")?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::templates::get_template;
    use tempfile::TempDir;

    fn notification(template: &str, shipment: &str) -> Notification {
        let t = get_template(template).unwrap();
        Notification {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            shipment_id: shipment.to_string(),
            template_name: t.name.to_string(),
            message: "test".to_string(),
            severity: t.severity,
            recipients: t.recipient_roles.iter().copied().collect(),
            metadata: BTreeMap::new(),
            read_by: BTreeSet::new(),
        }
    }

    #[test]
    fn test_append_and_filter_by_role() {
        let tmp = TempDir::new().unwrap();
        let store = NotificationStore::open(tmp.path()).unwrap();
        store
            .append(&notification("RECEIVER_ACK_TO_SENDER", "SHP-0000000001"))
            .unwrap();
        store
            .append(&notification("WAREHOUSE_INTAKE_READY", "SHP-0000000001"))
            .unwrap();

        let for_sender = store.for_role(ActorRole::SenderManager, false).unwrap();
        assert_eq!(for_sender.len(), 1);
        let for_warehouse = store.for_role(ActorRole::WarehouseManager, false).unwrap();
        assert_eq!(for_warehouse.len(), 1);
        assert_eq!(
            store.for_shipment("SHP-0000000001").unwrap().len(),
            2
        );
    }

    #[test]
    fn test_mark_read_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = NotificationStore::open(tmp.path()).unwrap();
        let n = notification("RECEIVER_ACK_TO_SENDER", "SHP-0000000001");
        store.append(&n).unwrap();

        store.mark_read(n.id, ActorRole::SenderManager).unwrap();
        store.mark_read(n.id, ActorRole::SenderManager).unwrap();

        let stored = &store.read_all().unwrap()[0];
        assert_eq!(stored.read_by.len(), 1);
        assert!(stored.read_by.contains(&ActorRole::SenderManager));
    }

    #[test]
    fn test_mark_read_requires_recipient() {
        let tmp = TempDir::new().unwrap();
        let store = NotificationStore::open(tmp.path()).unwrap();
        let n = notification("WAREHOUSE_INTAKE_READY", "SHP-0000000001");
        store.append(&n).unwrap();

        let err = store.mark_read(n.id, ActorRole::Viewer).unwrap_err();
        assert!(matches!(err, NotifyError::NotARecipient { .. }));
    }

    #[test]
    fn test_unread_filter_and_counts() {
        let tmp = TempDir::new().unwrap();
        let store = NotificationStore::open(tmp.path()).unwrap();
        let a = notification("RECEIVER_ACK_TO_SENDER", "SHP-0000000001");
        let b = notification("RECEIVER_ACK_DELAYED", "SHP-0000000002");
        store.append(&a).unwrap();
        store.append(&b).unwrap();

        store.mark_read(a.id, ActorRole::SenderManager).unwrap();

        let unread = store.for_role(ActorRole::SenderManager, true).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, b.id);

        let counts = store.counts_by_severity(ActorRole::SenderManager).unwrap();
        assert_eq!(counts.info, 0);
        assert_eq!(counts.warning, 1);
    }

    #[test]
    fn test_unknown_id_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = NotificationStore::open(tmp.path()).unwrap();
        store
            .append(&notification("RECEIVER_ACK_TO_SENDER", "SHP-0000000001"))
            .unwrap();
        let err = store
            .mark_read(Uuid::new_v4(), ActorRole::SenderManager)
            .unwrap_err();
        assert!(matches!(err, NotifyError::NotFound(_)));
    }
}
