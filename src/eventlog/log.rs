//! The append-only event log
//!
//! Single source of truth for every operational fact. Properties:
//!
//! - Append-only: one JSON object per line, never rewritten
//! - Single logical writer, serialized by a process-wide lock
//! - Every append is fsynced before it is acknowledged
//! - Validation happens before the write: lifecycle edge, role authority,
//!   duplicate creation, first-event shape
//! - Two cache layers: an mtime-keyed event cache (all events + a
//!   per-shipment index) and, downstream, the projector's derived state
//!   cache keyed by this log's version counter. Both invalidate on append.
//!
//! Reads are O(1) per shipment once the cache is built; the build itself is
//! a single O(N) pass guarded by a double-checked lock, so concurrent
//! readers never observe a half-built index.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::lifecycle::{
    validate_role_authority, validate_transition, EventType, LifecycleState,
};

use super::errors::{EventLogError, EventLogResult};
use super::record::{Event, EventCandidate, ShipmentId};

const LOG_FILE: &str = "shipments.jsonl";

/// In-memory view of the full log
#[derive(Debug, Default)]
pub struct EventCache {
    /// All events in append order
    pub events: Vec<Event>,
    /// Per-shipment indexes into `events`, ordered by sequence
    pub by_shipment: BTreeMap<ShipmentId, Vec<usize>>,
}

impl EventCache {
    /// Events for one shipment, in sequence order
    pub fn shipment_events(&self, shipment_id: &str) -> Vec<Event> {
        match self.by_shipment.get(shipment_id) {
            Some(indexes) => indexes.iter().map(|&i| self.events[i].clone()).collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Default)]
struct CacheSlot {
    mtime: Option<SystemTime>,
    data: Option<Arc<EventCache>>,
}

/// Log-wide integrity verification result
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    /// True when no violations were found
    pub valid: bool,
    /// One entry per violation
    pub errors: Vec<String>,
}

/// Summary statistics over the whole log
#[derive(Debug, Clone)]
pub struct AuditReport {
    /// Total appended events
    pub total_events: usize,
    /// Distinct shipments
    pub total_shipments: usize,
    /// Events per event type token
    pub event_type_distribution: BTreeMap<String, u64>,
    /// Events per actor role token
    pub actor_distribution: BTreeMap<String, u64>,
    /// Shipments per current-state token
    pub state_distribution: BTreeMap<String, u64>,
    /// Result of `verify_integrity`
    pub integrity: IntegrityReport,
    /// Timestamp of the first event, if any
    pub first_event_time: Option<DateTime<Utc>>,
    /// Timestamp of the last event, if any
    pub last_event_time: Option<DateTime<Utc>>,
}

/// The append-only event log
pub struct EventLog {
    log_path: PathBuf,
    // Serializes appends (single logical writer)
    append_lock: Mutex<()>,
    cache: RwLock<CacheSlot>,
    // Bumped on every successful append; keys downstream derived caches
    version: AtomicU64,
}

impl EventLog {
    /// Open or create the log under `log_dir`.
    ///
    /// # Errors
    ///
    /// Returns a fatal storage error if the directory cannot be created.
    pub fn open(log_dir: &Path) -> EventLogResult<Self> {
        fs::create_dir_all(log_dir).map_err(|e| {
            EventLogError::storage(
                format!("Failed to create log directory: {}", log_dir.display()),
                e,
            )
        })?;
        Ok(Self {
            log_path: log_dir.join(LOG_FILE),
            append_lock: Mutex::new(()),
            cache: RwLock::new(CacheSlot::default()),
            version: AtomicU64::new(0),
        })
    }

    /// Current log version; bumped on every successful append.
    ///
    /// Derived caches (projector state) key their freshness on this.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Append a validated event.
    ///
    /// The log assigns `event_id`, `sequence`, and a per-shipment
    /// non-decreasing `timestamp`. Validation order: duplicate creation,
    /// role authority, lifecycle transition. Any failure aborts with no
    /// side effects; a storage failure after validation is fatal.
    pub fn append(&self, candidate: EventCandidate) -> EventLogResult<Event> {
        let _writer = self
            .append_lock
            .lock()
            .map_err(|_| EventLogError::corruption("Event log writer lock poisoned"))?;

        let cache = self.cached()?;
        let prior = cache.shipment_events(&candidate.shipment_id);
        let current_state = prior
            .last()
            .map(|e| e.new_state)
            .unwrap_or(LifecycleState::None);

        // (1) Duplicate / first-event shape
        if candidate.event_type == EventType::ShipmentCreated {
            if prior
                .iter()
                .any(|e| e.event_type == EventType::ShipmentCreated)
            {
                return Err(EventLogError::duplicate_creation(&candidate.shipment_id));
            }
        } else if prior.is_empty() {
            return Err(crate::lifecycle::LifecycleError::InvalidTransition {
                from: LifecycleState::None,
                to: candidate.new_state,
            }
            .into());
        }

        // The caller's view of the world must match the log's
        if candidate.previous_state != current_state {
            return Err(EventLogError::unknown_state(
                &candidate.shipment_id,
                candidate.previous_state.as_str(),
                current_state.as_str(),
            ));
        }

        // (2) Role authority
        validate_role_authority(candidate.actor_role, current_state, candidate.event_type)?;

        // (3) Lifecycle edge. METADATA_UPDATED is a same-state event allowed
        // from any non-terminal state.
        if candidate.event_type == EventType::MetadataUpdated {
            if current_state.is_terminal() || candidate.new_state != current_state {
                return Err(crate::lifecycle::LifecycleError::InvalidTransition {
                    from: current_state,
                    to: candidate.new_state,
                }
                .into());
            }
        } else {
            validate_transition(current_state, candidate.new_state)?;
        }

        // Assign identity, sequence, and a monotonic timestamp
        let sequence = prior.len() as u64 + 1;
        let now = Utc::now();
        let timestamp = match prior.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        let event = Event {
            event_id: Uuid::new_v4(),
            sequence,
            timestamp,
            shipment_id: candidate.shipment_id,
            event_type: candidate.event_type,
            previous_state: candidate.previous_state,
            new_state: candidate.new_state,
            actor_role: candidate.actor_role,
            metadata: candidate.metadata,
        };

        self.persist(&event)?;

        // Invalidate the event cache; publish the new version last so
        // derived caches rebuilt against the old version re-key.
        {
            let mut slot = self
                .cache
                .write()
                .map_err(|_| EventLogError::corruption("Event cache lock poisoned"))?;
            slot.data = None;
            slot.mtime = None;
        }
        self.version.fetch_add(1, Ordering::AcqRel);

        Ok(event)
    }

    /// Durably write one event line (fsync before ack)
    fn persist(&self, event: &Event) -> EventLogResult<()> {
        let line = event
            .to_jsonl()
            .map_err(|e| EventLogError::corruption(format!("Event encode failed: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| {
                EventLogError::storage(
                    format!("Failed to open event log: {}", self.log_path.display()),
                    e,
                )
            })?;

        file.write_all(line.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .map_err(|e| EventLogError::storage("Event append failed", e))?;
        file.sync_all()
            .map_err(|e| EventLogError::storage("Event fsync failed", e))?;
        Ok(())
    }

    /// All events in append order
    pub fn read_all(&self) -> EventLogResult<Arc<EventCache>> {
        self.cached()
    }

    /// Events for one shipment, ordered by sequence
    pub fn read_by_shipment(&self, shipment_id: &str) -> EventLogResult<Vec<Event>> {
        Ok(self.cached()?.shipment_events(shipment_id))
    }

    /// All shipment ids seen by the log
    pub fn list_shipment_ids(&self) -> EventLogResult<Vec<ShipmentId>> {
        Ok(self.cached()?.by_shipment.keys().cloned().collect())
    }

    /// Verify sequence continuity, timestamp monotonicity, and transition
    /// validity for every shipment.
    pub fn verify_integrity(&self) -> EventLogResult<IntegrityReport> {
        let cache = self.cached()?;
        let mut errors = Vec::new();

        for (shipment_id, indexes) in &cache.by_shipment {
            let mut expected_seq = 1;
            let mut last: Option<&Event> = None;

            for &i in indexes {
                let event = &cache.events[i];

                if event.sequence != expected_seq {
                    errors.push(format!(
                        "{}: expected sequence {}, got {}",
                        shipment_id, expected_seq, event.sequence
                    ));
                }
                expected_seq += 1;

                if let Some(prev) = last {
                    if event.timestamp < prev.timestamp {
                        errors.push(format!(
                            "{}: non-monotonic timestamp at sequence {}",
                            shipment_id, event.sequence
                        ));
                    }
                    if event.previous_state != prev.new_state {
                        errors.push(format!(
                            "{}: state discontinuity at sequence {} ({} after {})",
                            shipment_id,
                            event.sequence,
                            event.previous_state,
                            prev.new_state
                        ));
                    }
                } else if event.event_type != EventType::ShipmentCreated {
                    errors.push(format!(
                        "{}: first event is {}, not SHIPMENT_CREATED",
                        shipment_id, event.event_type
                    ));
                }

                let edge_ok = if event.event_type == EventType::MetadataUpdated {
                    event.previous_state == event.new_state
                        && !event.previous_state.is_terminal()
                } else {
                    validate_transition(event.previous_state, event.new_state).is_ok()
                };
                if !edge_ok {
                    errors.push(format!(
                        "{}: forbidden transition {} -> {} at sequence {}",
                        shipment_id, event.previous_state, event.new_state, event.sequence
                    ));
                }

                last = Some(event);
            }
        }

        Ok(IntegrityReport {
            valid: errors.is_empty(),
            errors,
        })
    }

    /// Summary statistics and health over the whole log
    pub fn audit_report(&self) -> EventLogResult<AuditReport> {
        let cache = self.cached()?;
        let integrity = self.verify_integrity()?;

        let mut event_type_distribution: BTreeMap<String, u64> = BTreeMap::new();
        let mut actor_distribution: BTreeMap<String, u64> = BTreeMap::new();
        for event in &cache.events {
            *event_type_distribution
                .entry(event.event_type.as_str().to_string())
                .or_insert(0) += 1;
            *actor_distribution
                .entry(event.actor_role.as_str().to_string())
                .or_insert(0) += 1;
        }

        let mut state_distribution: BTreeMap<String, u64> = BTreeMap::new();
        for indexes in cache.by_shipment.values() {
            if let Some(&last) = indexes.last() {
                *state_distribution
                    .entry(cache.events[last].new_state.as_str().to_string())
                    .or_insert(0) += 1;
            }
        }

        Ok(AuditReport {
            total_events: cache.events.len(),
            total_shipments: cache.by_shipment.len(),
            event_type_distribution,
            actor_distribution,
            state_distribution,
            integrity,
            first_event_time: cache.events.first().map(|e| e.timestamp),
            last_event_time: cache.events.last().map(|e| e.timestamp),
        })
    }

    /// Get the event cache, rebuilding if the file changed.
    ///
    /// Double-checked: a read lock for the common hit, a write lock for the
    /// rebuild, and a re-check under the write lock so only one thread
    /// builds.
    fn cached(&self) -> EventLogResult<Arc<EventCache>> {
        let current_mtime = self.file_mtime()?;

        {
            let slot = self
                .cache
                .read()
                .map_err(|_| EventLogError::corruption("Event cache lock poisoned"))?;
            if let Some(ref data) = slot.data {
                if slot.mtime == current_mtime {
                    return Ok(Arc::clone(data));
                }
            }
        }

        let mut slot = self
            .cache
            .write()
            .map_err(|_| EventLogError::corruption("Event cache lock poisoned"))?;
        if let Some(ref data) = slot.data {
            if slot.mtime == current_mtime {
                return Ok(Arc::clone(data));
            }
        }

        let built = Arc::new(self.build_cache()?);
        slot.data = Some(Arc::clone(&built));
        slot.mtime = current_mtime;
        Ok(built)
    }

    fn file_mtime(&self) -> EventLogResult<Option<SystemTime>> {
        match fs::metadata(&self.log_path) {
            Ok(meta) => Ok(meta.modified().ok()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EventLogError::storage(
                format!("Failed to stat event log: {}", self.log_path.display()),
                e,
            )),
        }
    }

    /// One O(N) pass over the file
    fn build_cache(&self) -> EventLogResult<EventCache> {
        let contents = match fs::read_to_string(&self.log_path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(EventCache::default())
            }
            Err(e) => {
                return Err(EventLogError::storage(
                    format!("Failed to read event log: {}", self.log_path.display()),
                    e,
                ))
            }
        };

        let mut cache = EventCache::default();
        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let event = Event::from_jsonl(line).map_err(|e| {
                EventLogError::corruption(format!(
                    "Malformed event at line {}: {}",
                    line_no + 1,
                    e
                ))
            })?;
            let index = cache.events.len();
            cache
                .by_shipment
                .entry(event.shipment_id.clone())
                .or_default()
                .push(index);
            cache.events.push(event);
        }

        // Per-shipment ordering is by sequence, not file position
        let events = &cache.events;
        for indexes in cache.by_shipment.values_mut() {
            indexes.sort_by_key(|&i| events[i].sequence);
        }

        Ok(cache)
    }
}
