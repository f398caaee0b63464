//! Scripted executor for tests.
//!
//! [`RecordingExecutor`] answers queries from canned rows, fails statements
//! on request and records every call, so engine behavior can be asserted for
//! dialects without a live server.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::connection::{Row, SqlExecutor, SqlParam};
use crate::error::{MigrateResult, MigrationError};

/// A call made against a [`RecordingExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// `begin()`.
    Begin,
    /// `commit()`.
    Commit,
    /// `rollback()`.
    Rollback,
    /// `execute()` with its SQL and parameters.
    Execute(String, Vec<SqlParam>),
    /// `query()` with its SQL.
    Query(String),
}

#[derive(Debug, Default)]
struct State {
    events: Vec<Event>,
    responses: Vec<(String, Vec<Row>)>,
    failures: Vec<String>,
    delays: Vec<(String, Duration)>,
    in_transaction: bool,
    pending: Vec<String>,
    applied: Vec<String>,
}

/// In-memory [`SqlExecutor`] double.
#[derive(Debug)]
pub struct RecordingExecutor {
    provider: String,
    identity: String,
    file: Option<PathBuf>,
    state: Mutex<State>,
}

impl RecordingExecutor {
    /// Create an executor reporting `provider`.
    pub fn new(provider: impl Into<String>) -> Self {
        let provider = provider.into();
        Self {
            identity: format!("{}://recording", provider),
            provider,
            file: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Set the database identity.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Report a database file.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Answer queries containing `pattern` with `rows`.
    pub fn respond(self, pattern: impl Into<String>, rows: Vec<Row>) -> Self {
        self.state.lock().responses.push((pattern.into(), rows));
        self
    }

    /// Fail statements containing `pattern`.
    pub fn fail_on(self, pattern: impl Into<String>) -> Self {
        self.state.lock().failures.push(pattern.into());
        self
    }

    /// Delay statements containing `pattern`.
    pub fn delay_on(self, pattern: impl Into<String>, delay: Duration) -> Self {
        self.state.lock().delays.push((pattern.into(), delay));
        self
    }

    /// Every call, in order.
    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    /// SQL of every `execute()` call, in order.
    pub fn statements(&self) -> Vec<String> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Execute(sql, _) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    /// Statements whose effect persisted: committed, or run outside a
    /// transaction.
    pub fn applied(&self) -> Vec<String> {
        self.state.lock().applied.clone()
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.state.lock().in_transaction
    }

    fn delay_for(&self, sql: &str) -> Option<Duration> {
        self.state
            .lock()
            .delays
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, delay)| *delay)
    }
}

#[async_trait]
impl SqlExecutor for RecordingExecutor {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn database_identity(&self) -> String {
        self.identity.clone()
    }

    fn database_file(&self) -> Option<PathBuf> {
        self.file.clone()
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> MigrateResult<u64> {
        self.state
            .lock()
            .events
            .push(Event::Execute(sql.to_string(), params.to_vec()));

        if let Some(delay) = self.delay_for(sql) {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.failures.iter().any(|p| sql.contains(p.as_str())) {
            return Err(MigrationError::database(format!("scripted failure: {}", sql)));
        }
        if state.in_transaction {
            state.pending.push(sql.to_string());
        } else {
            state.applied.push(sql.to_string());
        }
        Ok(0)
    }

    async fn query(&self, sql: &str, _params: &[SqlParam]) -> MigrateResult<Vec<Row>> {
        let mut state = self.state.lock();
        state.events.push(Event::Query(sql.to_string()));
        if state.failures.iter().any(|p| sql.contains(p.as_str())) {
            return Err(MigrationError::database(format!("scripted failure: {}", sql)));
        }
        Ok(state
            .responses
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn begin(&self) -> MigrateResult<()> {
        let mut state = self.state.lock();
        if state.in_transaction {
            return Err(MigrationError::database("transaction already open"));
        }
        state.events.push(Event::Begin);
        state.in_transaction = true;
        Ok(())
    }

    async fn commit(&self) -> MigrateResult<()> {
        let mut state = self.state.lock();
        state.events.push(Event::Commit);
        state.in_transaction = false;
        let pending = std::mem::take(&mut state.pending);
        state.applied.extend(pending);
        Ok(())
    }

    async fn rollback(&self) -> MigrateResult<()> {
        let mut state = self.state.lock();
        state.events.push(Event::Rollback);
        state.in_transaction = false;
        state.pending.clear();
        Ok(())
    }
}
