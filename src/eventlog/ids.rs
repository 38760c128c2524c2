//! Durable shipment id generation
//!
//! Format: `SHP-` + 10-digit zero-padded counter (`SHP-0000000042`).
//!
//! The counter is an append-only JSONL file. Every generated id appends an
//! entry; restart recovery reads the last entry. Ids are generated once and
//! never reused, even across crashes: the entry is fsynced before the id is
//! handed out.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::errors::{EventLogError, EventLogResult};
use super::record::ShipmentId;

const COUNTER_FILE: &str = "shipment_counter.jsonl";

#[derive(Debug, Serialize, Deserialize)]
struct CounterEntry {
    counter: u64,
    timestamp: chrono::DateTime<Utc>,
    action: String,
}

/// Thread-safe, durable shipment id generator
pub struct ShipmentIdGenerator {
    counter_path: PathBuf,
    // Last issued counter; None until recovered from disk
    last: Mutex<Option<u64>>,
}

impl ShipmentIdGenerator {
    /// Open (or create) the counter log under `log_dir`.
    pub fn open(log_dir: &Path) -> EventLogResult<Self> {
        fs::create_dir_all(log_dir).map_err(|e| {
            EventLogError::storage(
                format!("Failed to create log directory: {}", log_dir.display()),
                e,
            )
        })?;
        Ok(Self {
            counter_path: log_dir.join(COUNTER_FILE),
            last: Mutex::new(None),
        })
    }

    /// Generate the next shipment id.
    ///
    /// The counter entry is appended and fsynced before the id is returned;
    /// an id that was handed out is never issued again.
    ///
    /// # Errors
    ///
    /// Returns a fatal storage error if the counter cannot be persisted.
    pub fn next_id(&self) -> EventLogResult<ShipmentId> {
        let mut last = self
            .last
            .lock()
            .map_err(|_| EventLogError::corruption("Shipment counter lock poisoned"))?;

        let current = match *last {
            Some(n) => n,
            None => self.recover_last_counter()?,
        };
        let next = current + 1;

        let entry = CounterEntry {
            counter: next,
            timestamp: Utc::now(),
            action: "ID_GENERATED".to_string(),
        };
        let line = serde_json::to_string(&entry)
            .map_err(|e| EventLogError::corruption(format!("Counter entry encode: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.counter_path)
            .map_err(|e| {
                EventLogError::storage(
                    format!("Failed to open counter log: {}", self.counter_path.display()),
                    e,
                )
            })?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .map_err(|e| EventLogError::storage("Counter append failed", e))?;
        file.sync_all()
            .map_err(|e| EventLogError::storage("Counter fsync failed", e))?;

        *last = Some(next);
        Ok(format_shipment_id(next))
    }

    /// Read the last counter from disk (0 when the file does not exist).
    fn recover_last_counter(&self) -> EventLogResult<u64> {
        let contents = match fs::read_to_string(&self.counter_path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(EventLogError::storage(
                    format!("Failed to read counter log: {}", self.counter_path.display()),
                    e,
                ))
            }
        };

        let mut last = 0;
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: CounterEntry = serde_json::from_str(line).map_err(|e| {
                EventLogError::corruption(format!("Malformed counter entry: {}", e))
            })?;
            last = entry.counter;
        }
        Ok(last)
    }
}

/// Format a counter as a shipment id
pub fn format_shipment_id(counter: u64) -> ShipmentId {
    format!("SHP-{:010}", counter)
}

/// Validate the `SHP-` + 10-digit format
pub fn is_valid_shipment_id(id: &str) -> bool {
    match id.strip_prefix("SHP-") {
        Some(digits) => digits.len() == 10 && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}
