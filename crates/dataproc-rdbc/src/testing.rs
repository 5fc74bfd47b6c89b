//! Testing utilities
//!
//! In-memory implementations of [`Connector`], [`Session`] and [`Engine`]
//! for exercising uploads, commands and queries without a SQL Server.
//!
//! # Example
//!
//! ```rust,ignore
//! use dataproc_rdbc::testing::*;
//!
//! let db = MemoryDatabase::new();
//! let connector = MemoryConnector::new(db.clone());
//!
//! process_and_upload(&connector, &params, b"a,b\n1,2\n", "t", IfExists::Replace).await?;
//! assert_eq!(db.table("t").unwrap().rows.len(), 1);
//! ```
//!
//! Sessions stage their writes and publish them to the shared database on
//! commit; closing a session discards anything uncommitted. Connection
//! failures can be injected and go through the real retry policy.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::connection::{ConnectionParameters, Connector, Engine, IfExists, Session};
use crate::dialect::{SqlServerDialect, TableName};
use crate::error::{Error, Result};
use crate::loader::UploadChunk;
use crate::retry::{connect_with_retry, ConnectFailure, HandleFlavor};
use crate::types::{Row, Value};

/// A table held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryTable {
    /// Column names
    pub columns: Vec<String>,
    /// Storage type per column, as it would be declared on SQL Server
    pub column_types: Vec<String>,
    /// Rows in insertion order
    pub rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    /// Create a table with every column typed `VARCHAR(255)`
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let column_types = vec![crate::dialect::DEFAULT_TEXT_TYPE.to_string(); columns.len()];
        Self {
            columns,
            column_types,
            rows,
        }
    }

    /// Storage type of a column
    pub fn column_type(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| self.column_types[idx].as_str())
    }
}

/// One recorded chunk write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkWrite {
    /// Target table as given
    pub table: String,
    /// Insert mode of the chunk
    pub mode: IfExists,
    /// Rows in the chunk
    pub rows: usize,
}

#[derive(Debug, Default)]
struct DatabaseState {
    tables: BTreeMap<String, MemoryTable>,
    writes: Vec<ChunkWrite>,
    executed: Vec<String>,
    commits: usize,
    closed_sessions: usize,
    disposed_engines: usize,
    fail_statements: Vec<String>,
    fail_chunk: Option<usize>,
}

/// Shared in-memory database
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<DatabaseState>>,
}

impl MemoryDatabase {
    /// Create an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a committed table
    pub fn with_table(self, name: &str, table: MemoryTable) -> Self {
        self.state.lock().tables.insert(table_key(name), table);
        self
    }

    /// Fail every statement containing `fragment` with a database error
    pub fn fail_statements_containing(self, fragment: &str) -> Self {
        self.state.lock().fail_statements.push(fragment.to_string());
        self
    }

    /// Fail the chunk write with the given 0-based index
    pub fn fail_chunk(self, index: usize) -> Self {
        self.state.lock().fail_chunk = Some(index);
        self
    }

    /// Committed table by name
    pub fn table(&self, name: &str) -> Option<MemoryTable> {
        self.state.lock().tables.get(&table_key(name)).cloned()
    }

    /// Every chunk write, committed or not
    pub fn writes(&self) -> Vec<ChunkWrite> {
        self.state.lock().writes.clone()
    }

    /// Every statement passed to [`Session::execute`]
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().executed.clone()
    }

    /// Number of commits
    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    /// Number of sessions closed
    pub fn closed_sessions(&self) -> usize {
        self.state.lock().closed_sessions
    }

    /// Number of engines disposed
    pub fn disposed_engines(&self) -> usize {
        self.state.lock().disposed_engines
    }

    fn check_statement(&self, sql: &str) -> Result<()> {
        let state = self.state.lock();
        match state.fail_statements.iter().find(|f| sql.contains(f.as_str())) {
            Some(fragment) => Err(Error::database(format!(
                "Incorrect syntax near '{}'.",
                fragment
            ))),
            None => Ok(()),
        }
    }
}

/// Lookup key: unquoted and case-insensitive, like default SQL Server collations
fn table_key(name: &str) -> String {
    name.trim()
        .split('.')
        .map(|part| part.trim().trim_start_matches('[').trim_end_matches(']'))
        .collect::<Vec<_>>()
        .join(".")
        .to_ascii_lowercase()
}

/// In-memory [`Connector`]
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    db: MemoryDatabase,
    failures_left: Arc<Mutex<u32>>,
    attempts: Arc<Mutex<u32>>,
    opened_with: Arc<Mutex<Vec<ConnectionParameters>>>,
}

impl MemoryConnector {
    /// Create a connector for `db` that always connects
    pub fn new(db: MemoryDatabase) -> Self {
        Self {
            db,
            failures_left: Arc::new(Mutex::new(0)),
            attempts: Arc::new(Mutex::new(0)),
            opened_with: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail the next `n` connection attempts
    pub fn with_connect_failures(self, n: u32) -> Self {
        *self.failures_left.lock() = n;
        self
    }

    /// Fail every connection attempt
    pub fn unreachable(self) -> Self {
        self.with_connect_failures(u32::MAX)
    }

    /// Connection attempts made so far
    pub fn attempts(&self) -> u32 {
        *self.attempts.lock()
    }

    /// Parameters of every successfully opened session or engine, in order
    pub fn opened_with(&self) -> Vec<ConnectionParameters> {
        self.opened_with.lock().clone()
    }

    /// The backing database
    pub fn database(&self) -> &MemoryDatabase {
        &self.db
    }

    async fn connect(&self, flavor: HandleFlavor) -> Result<()> {
        connect_with_retry(flavor, |_| {
            *self.attempts.lock() += 1;
            let mut left = self.failures_left.lock();
            let outcome = if *left > 0 {
                *left -= 1;
                Err(ConnectFailure::operational("connection refused"))
            } else {
                Ok(())
            };
            std::future::ready(outcome)
        })
        .await
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open_session(&self, params: &ConnectionParameters) -> Result<Box<dyn Session>> {
        params.validate()?;
        self.connect(HandleFlavor::Session).await?;
        self.opened_with.lock().push(params.clone());
        let staged = self.db.state.lock().tables.clone();
        Ok(Box::new(MemorySession {
            db: self.db.clone(),
            staged,
            dirty: false,
        }))
    }

    async fn open_engine(&self, params: &ConnectionParameters) -> Result<Box<dyn Engine>> {
        params.validate()?;
        self.connect(HandleFlavor::Engine).await?;
        self.opened_with.lock().push(params.clone());
        Ok(Box::new(MemoryEngine {
            db: self.db.clone(),
        }))
    }
}

/// In-memory [`Session`] with staged writes
#[derive(Debug)]
pub struct MemorySession {
    db: MemoryDatabase,
    staged: BTreeMap<String, MemoryTable>,
    dirty: bool,
}

#[async_trait]
impl Session for MemorySession {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.db.check_statement(sql)?;
        self.db.state.lock().executed.push(sql.to_string());
        Ok(())
    }

    async fn write_chunk(&mut self, chunk: &UploadChunk<'_>) -> Result<u64> {
        let table = TableName::parse(chunk.table)?;
        let key = table_key(chunk.table);
        {
            let mut state = self.db.state.lock();
            state.writes.push(ChunkWrite {
                table: chunk.table.to_string(),
                mode: chunk.mode,
                rows: chunk.len(),
            });
            if state.fail_chunk == Some(chunk.index) {
                return Err(Error::database(format!(
                    "Chunk {} rejected by server",
                    chunk.index
                )));
            }
        }

        let dialect = SqlServerDialect;
        let columns: Vec<String> = chunk
            .dataset
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let column_types: Vec<String> = chunk
            .dataset
            .columns()
            .iter()
            .map(|c| dialect.native_type(c, chunk.overrides).to_string())
            .collect();

        let exists = self.staged.contains_key(&key);
        match chunk.mode {
            IfExists::Fail if exists => {
                return Err(Error::database(format!("Table '{}' already exists.", table)));
            }
            IfExists::Replace | IfExists::Fail => {
                self.staged.remove(&key);
            }
            IfExists::Append => {}
        }

        let target = self.staged.entry(key).or_insert_with(|| MemoryTable {
            columns: columns.clone(),
            column_types,
            rows: Vec::new(),
        });
        if target.columns != columns {
            return Err(Error::database(format!(
                "Column name or number of supplied values does not match table definition of '{}'.",
                table
            )));
        }
        target.rows.extend(
            chunk
                .row_values()
                .map(|row| row.into_iter().cloned().collect::<Vec<_>>()),
        );
        self.dirty = true;
        Ok(chunk.len() as u64)
    }

    async fn commit(&mut self) -> Result<()> {
        let mut state = self.db.state.lock();
        if self.dirty {
            state.tables = self.staged.clone();
            self.dirty = false;
        }
        state.commits += 1;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.db.state.lock().closed_sessions += 1;
        Ok(())
    }
}

/// In-memory [`Engine`] answering `SELECT * FROM <table>`
#[derive(Debug)]
pub struct MemoryEngine {
    db: MemoryDatabase,
}

#[async_trait]
impl Engine for MemoryEngine {
    async fn read_sql(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.db
            .check_statement(sql)
            .map_err(|e| Error::sql(e.to_string()))?;

        let normalized = sql.trim().trim_end_matches(';').trim();
        let lower = normalized.to_ascii_lowercase();
        let name = lower
            .strip_prefix("select * from ")
            .map(|_| normalized["select * from ".len()..].trim())
            .ok_or_else(|| Error::sql(format!("Incorrect syntax near '{}'.", normalized)))?;

        let state = self.db.state.lock();
        let table = state
            .tables
            .get(&table_key(name))
            .ok_or_else(|| Error::sql(format!("Invalid object name '{}'.", name)))?;

        Ok(table
            .rows
            .iter()
            .map(|values| Row::new(table.columns.clone(), values.clone()))
            .collect())
    }

    async fn dispose(self: Box<Self>) -> Result<()> {
        self.db.state.lock().disposed_engines += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ConnectionParameters {
        ConnectionParameters::new("mem", "db", "user", "pw")
    }

    #[test]
    fn test_table_key_normalizes_quoting() {
        assert_eq!(table_key("[dbo].[Sales]"), "dbo.sales");
        assert_eq!(table_key(" Sales "), "sales");
    }

    #[tokio::test]
    async fn test_engine_reads_seeded_table() {
        let db = MemoryDatabase::new().with_table(
            "people",
            MemoryTable::new(
                vec!["name".into()],
                vec![vec![Value::from("ada")], vec![Value::from("alan")]],
            ),
        );
        let connector = MemoryConnector::new(db.clone());

        let mut engine = connector.open_engine(&params()).await.unwrap();
        let rows = engine.read_sql("SELECT * FROM [People];").await.unwrap();
        assert_eq!(rows.len(), 2);
        let record = rows[1].clone().into_record();
        assert_eq!(record["name"], serde_json::json!("alan"));

        let err = engine.read_sql("SELECT * FROM missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid object name 'missing'.");
    }

    #[tokio::test]
    async fn test_uncommitted_work_is_discarded() {
        let db = MemoryDatabase::new();
        let connector = MemoryConnector::new(db.clone());

        let mut session = connector.open_session(&params()).await.unwrap();
        session.execute("DELETE FROM t").await.unwrap();
        session.close().await.unwrap();

        assert_eq!(db.executed(), vec!["DELETE FROM t"]);
        assert_eq!(db.commits(), 0);
        assert_eq!(db.closed_sessions(), 1);
    }
}
