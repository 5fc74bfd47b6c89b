// Logging, powered by tracing-subscriber
//
// One process-wide subscriber, installed once at startup: an append-only
// file layer plus an optional console layer, both behind the same filter.

use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Build the filter from the configured level plus quieter defaults for
/// chatty dependencies
fn build_env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    let mut directives = vec![level.to_string()];

    let noisy: &[(&str, &str)] = &[
        ("tiberius", "warn"),
        ("hyper", "warn"),
        ("rustls", "warn"),
    ];
    for (target, lvl) in noisy {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

/// Initialize logging.
///
/// Fails if the log file cannot be opened, the level is not a valid filter,
/// or a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    if let Some(parent) = config.file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)?;

    let console_layer = if config.to_console {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_filter(build_env_filter(&config.level)?),
        )
    } else {
        None
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(log_file))
        .with_filter(build_env_filter(&config.level)?);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::debug!(
        "Logging initialized: level={}, console={}, file={}",
        config.level,
        config.to_console,
        config.file.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_levels_and_directives() {
        assert!(build_env_filter("info").is_ok());
        assert!(build_env_filter("dataproc_rdbc=debug,warn").is_ok());
    }

    #[test]
    fn test_filter_rejects_garbage() {
        assert!(build_env_filter("info,dataproc=loud").is_err());
    }
}
