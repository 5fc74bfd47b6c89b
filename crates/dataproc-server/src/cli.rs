//! CLI argument parsing for the dataproc server
//!
//! Every option can also be set through a `DATAPROC_*` environment variable.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config::{LoggingConfig, ServerConfig};

/// dataproc - CSV upload, SQL command and query API for SQL Server
#[derive(Parser, Debug)]
#[command(name = "dataproc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Server bind address
    #[arg(short, long, default_value = "0.0.0.0:8000", env = "DATAPROC_BIND")]
    pub bind: SocketAddr,

    /// Log file, opened in append mode
    #[arg(long, default_value = "Status.log", env = "DATAPROC_LOG_FILE")]
    pub log_file: PathBuf,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "DATAPROC_LOG_LEVEL")]
    pub log_level: String,

    /// Also write logs to stdout
    #[arg(
        long,
        default_value = "true",
        action = clap::ArgAction::Set,
        env = "DATAPROC_LOG_TO_CONSOLE"
    )]
    pub log_to_console: bool,

    /// Largest accepted upload, in bytes
    #[arg(long, default_value = "536870912", env = "DATAPROC_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,
}

impl Cli {
    /// Build the server configuration
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind: self.bind,
            max_upload_bytes: self.max_upload_bytes,
            logging: LoggingConfig {
                level: self.log_level.clone(),
                file: self.log_file.clone(),
                to_console: self.log_to_console,
            },
        }
    }
}
