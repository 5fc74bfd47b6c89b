//! Error types for dataproc-rdbc
//!
//! Every failure is classified into an [`ErrorCategory`], which the HTTP layer
//! uses to pick a status code and a `"<category>: <message>"` detail string:
//! - Configuration: a required connection parameter is missing
//! - Connection: every connection attempt failed
//! - Database / Sql: the driver reported a failure (session / engine flavor)
//! - Validation: a required request parameter is blank
//! - Unexpected: anything else, including malformed CSV uploads

use std::fmt;
use thiserror::Error;

/// Result type for dataproc-rdbc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing or empty connection parameter
    Configuration,
    /// Connection attempts exhausted
    Connection,
    /// Driver failure on a raw session
    Database,
    /// Driver failure on an engine (query path)
    Sql,
    /// Blank request parameter
    Validation,
    /// Everything else
    Unexpected,
}

impl ErrorCategory {
    /// Label used as the prefix of user-facing error details
    pub const fn label(self) -> &'static str {
        match self {
            Self::Configuration => "Configuration error",
            Self::Connection => "Connection error",
            Self::Database => "Database error",
            Self::Sql => "SQL error",
            Self::Validation => "Validation error",
            Self::Unexpected => "Unexpected error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Connection => write!(f, "connection"),
            Self::Database => write!(f, "database"),
            Self::Sql => write!(f, "sql"),
            Self::Validation => write!(f, "validation"),
            Self::Unexpected => write!(f, "unexpected"),
        }
    }
}

/// Main error type for dataproc-rdbc
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    /// A required connection parameter is missing
    #[error("{message}")]
    Configuration { message: String },

    /// All connection attempts failed
    #[error("{message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Driver-reported failure on a session (execute, commit, bulk write)
    #[error("{message}")]
    Database {
        message: String,
        sql: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Driver-reported failure on an engine (query execution)
    #[error("{message}")]
    Sql {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A required request parameter is blank
    #[error("{message}")]
    Validation { message: String },

    /// Uploaded data could not be decoded into a dataset
    #[error("{message}")]
    Dataset {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Any other failure
    #[error("{message}")]
    Unexpected { message: String },
}

impl Error {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Connection { .. } => ErrorCategory::Connection,
            Self::Database { .. } => ErrorCategory::Database,
            Self::Sql { .. } => ErrorCategory::Sql,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Dataset { .. } | Self::Unexpected { .. } => ErrorCategory::Unexpected,
        }
    }

    /// `"<category label>: <message>"`, the form surfaced to HTTP callers
    pub fn detail(&self) -> String {
        format!("{}: {}", self.category().label(), self)
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            sql: None,
            source: None,
        }
    }

    /// Create an engine-side SQL error
    pub fn sql(message: impl Into<String>) -> Self {
        Self::Sql {
            message: message.into(),
            source: None,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a dataset error with source
    pub fn dataset(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Dataset {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// The statement that failed, when known
    pub fn sql_text(&self) -> Option<&str> {
        match self {
            Self::Database { sql, .. } => sql.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            Error::config("missing").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            Error::connection("down").category(),
            ErrorCategory::Connection
        );
        assert_eq!(Error::database("boom").category(), ErrorCategory::Database);
        assert_eq!(Error::sql("bad").category(), ErrorCategory::Sql);
        assert_eq!(
            Error::validation("blank").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            Error::unexpected("???").category(),
            ErrorCategory::Unexpected
        );
    }

    #[test]
    fn test_dataset_errors_are_unexpected() {
        let io = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad utf-8");
        let err = Error::dataset("could not decode upload", io);
        assert_eq!(err.category(), ErrorCategory::Unexpected);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_detail() {
        let err = Error::database("Invalid object name 'nope'.");
        assert_eq!(err.detail(), "Database error: Invalid object name 'nope'.");

        let err = Error::sql("Incorrect syntax near 'FORM'.");
        assert_eq!(err.detail(), "SQL error: Incorrect syntax near 'FORM'.");
    }

    #[test]
    fn test_sql_text() {
        let err = Error::Database {
            message: "syntax error".into(),
            sql: Some("SELEC 1".into()),
            source: None,
        };
        assert_eq!(err.sql_text(), Some("SELEC 1"));
        assert_eq!(Error::database("x").sql_text(), None);
        assert_eq!(Error::sql("x").sql_text(), None);
    }
}
