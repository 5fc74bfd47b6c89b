//! # dataproc-server
//!
//! HTTP API over [`dataproc_rdbc`]: CSV uploads into SQL Server tables,
//! one-off SQL commands and query results as JSON.
//!
//! ## Endpoints
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | POST | `/DataProcessor/process_and_upload_data` | Upload a CSV file into a table |
//! | GET | `/DataProcessor/execute_query` | Run a SQL command |
//! | GET | `/DataProcessor/get_query_output` | Run a query, rows as JSON records |
//! | GET | `/health` | Liveness |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;

pub use config::{LoggingConfig, ServerConfig};
pub use error::{ApiError, ErrorResponse};
pub use server::DataProcessorServer;
