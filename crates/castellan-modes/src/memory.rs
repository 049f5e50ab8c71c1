//! In-memory implementations of the collaborator traits.
//!
//! `InMemoryDatabase` answers queries from a seeded statement → rows table
//! and counts every query it receives, which is what the cache-idempotence
//! tests observe. `InMemoryLogSink` captures records into a vector for
//! later inspection. Both keep their state behind a `Mutex` so they can be
//! shared across the mode stack via `Arc`.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tracing::debug;

use crate::collab::{DatabaseConnector, LogRecord, LogSink, Row};

// ── Database ──────────────────────────────────────────────────────────────────

struct DbState {
    /// Canned result rows, keyed by exact statement text.
    canned: HashMap<String, Vec<Row>>,
    /// Statements that report a collaborator failure when queried.
    failing: HashSet<String>,
    /// Every statement received, in arrival order.
    received: Vec<String>,
}

/// A seedable in-memory stand-in for the database collaborator.
///
/// Unseeded statements resolve to zero rows, matching a query that finds
/// nothing.
pub struct InMemoryDatabase {
    state: Mutex<DbState>,
}

impl InMemoryDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DbState {
                canned: HashMap::new(),
                failing: HashSet::new(),
                received: Vec::new(),
            }),
        }
    }

    /// Seed `statement` with canned result rows.
    pub fn seed(&self, statement: impl Into<String>, rows: Vec<Row>) {
        self.state.lock().expect("database state lock poisoned").canned.insert(statement.into(), rows);
    }

    /// Make `statement` report a failure instead of rows.
    pub fn fail_on(&self, statement: impl Into<String>) {
        self.state.lock().expect("database state lock poisoned").failing.insert(statement.into());
    }

    /// Number of queries received so far.
    pub fn query_count(&self) -> usize {
        self.state.lock().expect("database state lock poisoned").received.len()
    }

    /// All statements received, in arrival order.
    pub fn received_statements(&self) -> Vec<String> {
        self.state.lock().expect("database state lock poisoned").received.clone()
    }
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseConnector for InMemoryDatabase {
    fn query(&self, statement: &str) -> Result<Vec<Row>, String> {
        let mut state = self.state.lock().expect("database state lock poisoned");
        state.received.push(statement.to_string());
        if state.failing.contains(statement) {
            return Err(format!("seeded failure for statement '{}'", statement));
        }
        let rows = state.canned.get(statement).cloned().unwrap_or_default();
        debug!(statement, rows = rows.len(), "in-memory database answered query");
        Ok(rows)
    }
}

// ── Log sink ──────────────────────────────────────────────────────────────────

/// A log sink that captures every record for later inspection.
pub struct InMemoryLogSink {
    records: Mutex<Vec<LogRecord>>,
}

impl InMemoryLogSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// All records written so far, in write order.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().expect("log sink lock poisoned").clone()
    }
}

impl Default for InMemoryLogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for InMemoryLogSink {
    fn write(&self, record: LogRecord) -> Result<(), String> {
        self.records.lock().expect("log sink lock poisoned").push(record);
        Ok(())
    }
}

// ── Row construction helper ───────────────────────────────────────────────────

/// Build a `Row` from string key/value pairs.
pub fn row(pairs: &[(&str, &str)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use castellan_contracts::command::Severity;
    use chrono::Utc;

    use super::*;

    #[test]
    fn unseeded_statement_returns_no_rows() {
        let db = InMemoryDatabase::new();
        let rows = db.query("SELECT nothing").unwrap();
        assert!(rows.is_empty());
        assert_eq!(db.query_count(), 1);
    }

    #[test]
    fn seeded_statement_returns_canned_rows() {
        let db = InMemoryDatabase::new();
        db.seed("SELECT role", vec![row(&[("role", "editor")])]);
        let rows = db.query("SELECT role").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["role"], "editor");
    }

    #[test]
    fn failing_statement_reports_reason() {
        let db = InMemoryDatabase::new();
        db.fail_on("SELECT broken");
        let err = db.query("SELECT broken").unwrap_err();
        assert!(err.contains("SELECT broken"));
    }

    #[test]
    fn sink_captures_records_in_order() {
        let sink = InMemoryLogSink::new();
        for (i, severity) in [Severity::Info, Severity::Error].iter().enumerate() {
            sink.write(LogRecord {
                message: format!("message {}", i),
                severity: *severity,
                log_name: "default".to_string(),
                logged_at: Utc::now(),
            })
            .unwrap();
        }
        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "message 0");
        assert_eq!(records[1].severity, Severity::Error);
    }
}
