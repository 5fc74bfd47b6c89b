//! Execution of caller-supplied SQL commands
//!
//! The command text is executed verbatim, without parsing or sanitisation.
//! Only trusted callers may reach this.

use tracing::info;

use crate::connection::{close_session, ConnectionParameters, Connector};
use crate::error::Result;

/// Open a session, run `command`, commit and close.
///
/// Returns `"Executed query successfully: <command>"`.
pub async fn execute_command(
    connector: &dyn Connector,
    params: &ConnectionParameters,
    command: &str,
) -> Result<String> {
    let mut session = connector.open_session(params).await?;

    let outcome = match session.execute(command).await {
        Ok(()) => session.commit().await,
        Err(e) => Err(e),
    };
    close_session(session).await;
    outcome?;

    info!("Executed command on {}", params.target());
    Ok(format!("Executed query successfully: {}", command))
}
