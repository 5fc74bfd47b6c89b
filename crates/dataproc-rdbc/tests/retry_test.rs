//! Connection retry tests
//!
//! Run on tokio's paused clock, so backoff sleeps complete instantly while
//! still being observable through `tokio::time::Instant`.

use std::time::Duration;

use dataproc_rdbc::connection::{ConnectionParameters, Connector};
use dataproc_rdbc::retry::{connect_with_retry, ConnectFailure, HandleFlavor};
use dataproc_rdbc::testing::{MemoryConnector, MemoryDatabase};
use dataproc_rdbc::ErrorCategory;
use tokio::time::Instant;

fn params() -> ConnectionParameters {
    ConnectionParameters::new("db.internal", "sales", "loader", "secret")
}

#[tokio::test(start_paused = true)]
async fn test_three_attempts_with_doubling_backoff() {
    let start = Instant::now();
    let mut attempts = Vec::new();

    let result: dataproc_rdbc::Result<()> = connect_with_retry(HandleFlavor::Session, |n| {
        attempts.push((n, start.elapsed()));
        std::future::ready(Err(ConnectFailure::operational("connection refused")))
    })
    .await;

    let offsets: Vec<(u32, u64)> = attempts.iter().map(|(n, d)| (*n, d.as_secs())).collect();
    assert_eq!(offsets, vec![(1, 0), (2, 60), (3, 180)]);
    // no sleep after the last attempt
    assert_eq!(start.elapsed().as_secs(), 180);

    let err = result.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Connection);
    assert_eq!(
        err.to_string(),
        "Failed to connect to SQL Server after several attempts."
    );
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_engine_flavor_wording() {
    let result: dataproc_rdbc::Result<()> = connect_with_retry(HandleFlavor::Engine, |_| {
        std::future::ready(Err(ConnectFailure::operational("login timeout")))
    })
    .await;

    assert_eq!(
        result.unwrap_err().to_string(),
        "Failed to create SQL engine after several attempts."
    );
}

#[tokio::test(start_paused = true)]
async fn test_hung_attempts_time_out() {
    let start = Instant::now();

    let result: dataproc_rdbc::Result<()> =
        connect_with_retry(HandleFlavor::Session, |_| std::future::pending()).await;

    assert_eq!(result.unwrap_err().category(), ErrorCategory::Connection);
    // 3 x 240s timeout plus 60s and 120s of backoff
    assert_eq!(start.elapsed(), Duration::from_secs(900));
}

#[tokio::test(start_paused = true)]
async fn test_succeeds_on_second_attempt() {
    let connector = MemoryConnector::new(MemoryDatabase::new()).with_connect_failures(1);
    let start = Instant::now();

    let session = connector.open_session(&params()).await.unwrap();
    session.close().await.unwrap();

    assert_eq!(connector.attempts(), 2);
    assert_eq!(start.elapsed().as_secs(), 60);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_server_exhausts_attempts() {
    let connector = MemoryConnector::new(MemoryDatabase::new()).unreachable();

    let err = connector.open_engine(&params()).await.err().unwrap();

    assert_eq!(connector.attempts(), 3);
    assert_eq!(err.category(), ErrorCategory::Connection);
    assert_eq!(
        err.detail(),
        "Connection error: Failed to create SQL engine after several attempts."
    );
}

#[tokio::test]
async fn test_missing_parameter_never_connects() {
    let connector = MemoryConnector::new(MemoryDatabase::new());
    let params = ConnectionParameters::new("db.internal", "sales", "", "secret");

    let err = connector.open_session(&params).await.err().unwrap();

    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(err.to_string().contains("sql_user"));
    assert_eq!(connector.attempts(), 0);
}
