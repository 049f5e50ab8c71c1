//! External collaborator seams.
//!
//! The modes never open files or sockets themselves — the database and the
//! log destination are consumed through these two traits. Implementations
//! are wired in at boot; `crate::memory` provides the in-memory reference
//! implementations used by tests and the demo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use castellan_contracts::command::Severity;

/// One associative result row from the database collaborator.
pub type Row = serde_json::Map<String, Value>;

/// The opaque query target behind `DbQuery` commands.
///
/// The Server mode sends a structured statement and gets back a list of
/// associative rows or a failure reason. Statement format and transport
/// are entirely the implementation's concern.
pub trait DatabaseConnector: Send + Sync {
    /// Execute `statement` and return its result rows.
    fn query(&self, statement: &str) -> Result<Vec<Row>, String>;
}

/// A single captured log entry, as delivered to a `LogSink`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub message: String,
    pub severity: Severity,
    /// The named destination, or the sink's default.
    pub log_name: String,
    /// Wall-clock write time (UTC).
    pub logged_at: DateTime<Utc>,
}

/// The destination behind `Log` commands.
///
/// Modes that intercept log commands hand the record here; they never
/// format or persist log output themselves.
pub trait LogSink: Send + Sync {
    /// Append one record to the sink.
    fn write(&self, record: LogRecord) -> Result<(), String>;
}
