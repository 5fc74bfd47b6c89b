//! Connection retry with exponential backoff
//!
//! Establishing a connection is the only retried operation. The policy is
//! fixed: three attempts, 60 seconds after the first failure, doubling after
//! each subsequent failure, no sleep after the last attempt. Every attempt is
//! additionally bounded by the driver connection timeout.
//!
//! Each call runs its own counted loop; no backoff state is shared between
//! concurrent callers.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::error::{Error, Result};

/// Number of connection attempts before giving up
pub const CONNECT_ATTEMPTS: u32 = 3;

/// Delay after the first failed attempt
pub const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Factor applied to the delay after every further failure
pub const BACKOFF_MULTIPLIER: u32 = 2;

/// Upper bound for a single connection attempt
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(240);

/// Delay to wait after the given failed attempt (1-based).
///
/// `delay_for_attempt(1) == 60s`, `delay_for_attempt(2) == 120s`.
pub fn delay_for_attempt(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    INITIAL_RETRY_DELAY.saturating_mul(BACKOFF_MULTIPLIER.saturating_pow(exponent))
}

/// Classification of a single failed connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Network-level failure: refused, reset, timed out
    Operational,
    /// Driver/protocol-level failure: TLS, routing, malformed packets
    Interface,
    /// The server answered with an error (e.g. login failed)
    Database,
    /// Anything else
    Unexpected,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operational => write!(f, "OperationalError"),
            Self::Interface => write!(f, "InterfaceError"),
            Self::Database => write!(f, "DatabaseError"),
            Self::Unexpected => write!(f, "Unexpected error"),
        }
    }
}

/// A failed connection attempt
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct ConnectFailure {
    /// How the attempt failed
    pub kind: FailureKind,
    /// Driver message
    pub message: String,
}

impl ConnectFailure {
    /// Create a classified failure
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Network-level failure
    pub fn operational(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Operational, message)
    }
}

/// Which kind of handle is being opened; only changes log and error wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleFlavor {
    /// Raw driver session
    Session,
    /// Query engine
    Engine,
}

impl HandleFlavor {
    fn attempt_action(self) -> &'static str {
        match self {
            Self::Session => "connect to SQL Server",
            Self::Engine => "create SQL engine",
        }
    }

    /// Message of the error returned once every attempt has failed
    pub fn exhausted_message(self) -> &'static str {
        match self {
            Self::Session => "Failed to connect to SQL Server after several attempts.",
            Self::Engine => "Failed to create SQL engine after several attempts.",
        }
    }
}

/// Run `connect` until it succeeds or [`CONNECT_ATTEMPTS`] attempts failed.
///
/// `connect` receives the 1-based attempt number. Each attempt is bounded by
/// [`CONNECT_TIMEOUT`]; an attempt that times out counts as an operational
/// failure.
pub async fn connect_with_retry<T, F, Fut>(flavor: HandleFlavor, mut connect: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, ConnectFailure>>,
{
    let mut last_failure = None;

    for attempt in 1..=CONNECT_ATTEMPTS {
        info!("Attempt {} to {}.", attempt, flavor.attempt_action());

        let outcome = match tokio::time::timeout(CONNECT_TIMEOUT, connect(attempt)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ConnectFailure::operational(format!(
                "connection attempt timed out after {} seconds",
                CONNECT_TIMEOUT.as_secs()
            ))),
        };

        match outcome {
            Ok(handle) => return Ok(handle),
            Err(failure) => {
                error!("{} on attempt {}: {}", failure.kind, attempt, failure.message);
                last_failure = Some(failure);
            }
        }

        if attempt < CONNECT_ATTEMPTS {
            let delay = delay_for_attempt(attempt);
            info!("Retrying in {} seconds...", delay.as_secs());
            tokio::time::sleep(delay).await;
        }
    }

    Err(match last_failure {
        Some(failure) => Error::connection_with_source(flavor.exhausted_message(), failure),
        None => Error::connection(flavor.exhausted_message()),
    })
}
