//! dataproc server binary
//!
//! ```bash
//! dataproc --bind 0.0.0.0:8000 --log-file Status.log
//! ```

use std::sync::Arc;

use clap::Parser;
use dataproc_rdbc::prelude::SqlServerConnector;
use dataproc_server::cli::Cli;
use dataproc_server::{logging, DataProcessorServer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.server_config();

    logging::init(&config.logging)?;

    info!(
        "Starting dataproc v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.bind
    );

    let server = DataProcessorServer::new(Arc::new(SqlServerConnector::new()), config);
    server.run().await
}
