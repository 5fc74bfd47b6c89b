//! # dataproc-rdbc
//!
//! SQL Server connectivity for the dataproc service: CSV datasets, chunked
//! bulk loading, command execution and JSON query results.
//!
//! ## Features
//!
//! - **Retried Connections**: three attempts with exponential backoff (60s, 120s)
//! - **Two Handle Flavors**: raw sessions for writes, engines for queries
//! - **CSV Datasets**: typed, column-oriented tables parsed from uploads
//! - **Bulk Loading**: 50,000-row chunks, wide-text detection, replace/append/fail
//! - **Record Output**: query rows as ordered JSON objects
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dataproc_rdbc::prelude::*;
//!
//! let connector = SqlServerConnector::new();
//! let params = ConnectionParameters::new("db.example.net", "sales", "loader", "secret");
//!
//! // Load a CSV file, replacing the table
//! let outcome = process_and_upload(&connector, &params, &bytes, "orders", IfExists::Replace).await?;
//!
//! // Run a command
//! let message = execute_command(&connector, &params, "TRUNCATE TABLE staging").await?;
//!
//! // Fetch rows as JSON records
//! let records = run_query(&connector, QueryRequest::new("SELECT * FROM orders", params)).await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `sqlserver` (default) - SQL Server support via tiberius

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod connection;
pub mod dataset;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod loader;
pub mod query;
pub mod retry;
pub mod testing;
pub mod types;

#[cfg(feature = "sqlserver")]
pub mod sqlserver;

/// Prelude module for convenient imports
pub mod prelude {
    // Error types
    pub use crate::error::{Error, ErrorCategory, Result};

    // Value and type system
    pub use crate::types::{Record, Row, Value};

    // Connection traits and parameters
    pub use crate::connection::{ConnectionParameters, Connector, Engine, IfExists, Session};

    // Datasets and loading
    pub use crate::dataset::{Column, ColumnType, Dataset};
    pub use crate::loader::{
        process_and_upload, BulkLoader, ColumnTypeOverride, UploadChunk, UploadOutcome,
        CHUNK_SIZE,
    };

    // Commands and queries
    pub use crate::executor::execute_command;
    pub use crate::query::{run_query, QueryRequest};

    #[cfg(feature = "sqlserver")]
    pub use crate::sqlserver::SqlServerConnector;
}

// Re-export commonly used items at crate root
pub use error::{Error, ErrorCategory, Result};
pub use types::{Record, Value};
