//! Connection traits for dataproc-rdbc
//!
//! Core abstractions for database connectivity:
//! - ConnectionParameters: the credentials identifying one target database
//! - Session: a raw driver session (execute, chunk writes, commit, close)
//! - Engine: a higher-level handle for tabular query execution
//! - Connector: opens either flavor, with validation and retry

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::{Error, Result};
use crate::loader::UploadChunk;
use crate::types::Row;

/// Credentials identifying one target database.
///
/// Request-scoped: built from the caller's query parameters and never
/// persisted. `Debug` redacts the password.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    /// Server host name (without port)
    pub server: String,
    /// Database name
    pub database: String,
    /// SQL login
    pub username: String,
    /// SQL password
    pub password: String,
}

impl ConnectionParameters {
    /// Create connection parameters
    pub fn new(
        server: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            database: database.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Names of the parameters that are empty
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("sql_server", &self.server),
            ("database", &self.database),
            ("sql_user", &self.username),
            ("sql_password", &self.password),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Fail with a configuration error unless every parameter is non-empty
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::config(format!(
            "All parameters (sql_server, database, sql_user, sql_password) must be provided; missing: {}",
            missing.join(", ")
        )))
    }

    /// `server/database`, safe for logs
    pub fn target(&self) -> String {
        format!("{}/{}", self.server, self.database)
    }
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// What a chunk write does when the target table already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IfExists {
    /// Drop and recreate the table
    #[default]
    Replace,
    /// Insert into the existing table, creating it if missing
    Append,
    /// Refuse to write into an existing table
    Fail,
}

impl IfExists {
    /// Lowercase name as accepted on the wire
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Append => "append",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IfExists {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "append" => Ok(Self::Append),
            "fail" => Ok(Self::Fail),
            other => Err(Error::unexpected(format!(
                "'{}' is not valid for if_exists; expected one of replace, append, fail",
                other
            ))),
        }
    }
}

/// A raw database session, owned by the request that opened it.
///
/// Work done through a session is not durable until [`Session::commit`].
/// Callers must [`Session::close`] the session on every exit path.
#[async_trait]
pub trait Session: Send {
    /// Execute a batch verbatim, discarding any rows it produces
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Write one chunk of a dataset into its target table
    async fn write_chunk(&mut self, chunk: &UploadChunk<'_>) -> Result<u64>;

    /// Commit all work done since the last commit
    async fn commit(&mut self) -> Result<()>;

    /// Close the session, discarding uncommitted work
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A query handle used for tabular result retrieval
#[async_trait]
pub trait Engine: Send {
    /// Run a query and materialize its first result set
    async fn read_sql(&mut self, sql: &str) -> Result<Vec<Row>>;

    /// Release the underlying connection
    async fn dispose(self: Box<Self>) -> Result<()>;
}

/// Opens sessions and engines for a set of connection parameters
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a raw session
    async fn open_session(&self, params: &ConnectionParameters) -> Result<Box<dyn Session>>;

    /// Open a query engine
    async fn open_engine(&self, params: &ConnectionParameters) -> Result<Box<dyn Engine>>;
}

/// Close a session, logging instead of returning a failure so that it never
/// masks the result of the work done on it
pub(crate) async fn close_session(session: Box<dyn Session>) {
    if let Err(e) = session.close().await {
        warn!("Failed to close SQL Server session: {}", e);
    }
}

/// Dispose an engine, logging failures
pub(crate) async fn dispose_engine(engine: Box<dyn Engine>) {
    if let Err(e) = engine.dispose().await {
        warn!("Failed to dispose SQL engine: {}", e);
    }
}
