//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;

/// Default listen address
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

/// Default log file, appended to across restarts
pub const DEFAULT_LOG_FILE: &str = "Status.log";

/// Default request body limit for uploads (512 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address
    pub bind: SocketAddr,
    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
    /// Logging setup
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level or filter directive (`info`, `dataproc_rdbc=debug,info`)
    pub level: String,
    /// Append-only log file
    pub file: PathBuf,
    /// Also log to stdout
    pub to_console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: PathBuf::from(DEFAULT_LOG_FILE),
            to_console: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.max_upload_bytes, 536_870_912);
        assert_eq!(config.logging.file, PathBuf::from("Status.log"));
        assert!(config.logging.to_console);
    }
}
