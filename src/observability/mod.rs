//! Observability for controltower
//!
//! Structured JSON logging only. Principles:
//!
//! 1. Observability is read-only
//! 2. No side effects on event emission or snapshot writes
//! 3. No async or background threads
//! 4. Deterministic output (alphabetical key ordering)
//!
//! A logging failure must never fail the operation being logged.

mod logger;

pub use logger::{Logger, Severity};
