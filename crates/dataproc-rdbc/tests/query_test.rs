//! Command execution and query tests against the in-memory database

use dataproc_rdbc::connection::ConnectionParameters;
use dataproc_rdbc::executor::execute_command;
use dataproc_rdbc::query::{run_query, QueryRequest};
use dataproc_rdbc::testing::{MemoryConnector, MemoryDatabase, MemoryTable};
use dataproc_rdbc::{ErrorCategory, Value};
use serde_json::json;

fn params() -> ConnectionParameters {
    ConnectionParameters::new("db.internal", "sales", "reader", "secret")
}

fn seeded() -> MemoryDatabase {
    MemoryDatabase::new().with_table(
        "orders",
        MemoryTable::new(
            vec!["id".into(), "customer".into(), "total".into()],
            vec![
                vec![Value::Int64(1), Value::from("acme"), Value::Float64(10.5)],
                vec![Value::Int64(2), Value::from("globex"), Value::Null],
            ],
        ),
    )
}

#[tokio::test]
async fn test_query_returns_records_in_order() {
    let db = seeded();
    let connector = MemoryConnector::new(db.clone());

    let records = run_query(&connector, QueryRequest::new("SELECT * FROM orders", params()))
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(
        serde_json::Value::Object(records[0].clone()),
        json!({"id": 1, "customer": "acme", "total": 10.5})
    );
    let keys: Vec<&String> = records[1].keys().collect();
    assert_eq!(keys, vec!["id", "customer", "total"]);
    assert_eq!(records[1]["total"], serde_json::Value::Null);
    assert_eq!(db.disposed_engines(), 1);
}

#[tokio::test]
async fn test_query_blank_parameter_fails_before_connecting() {
    let connector = MemoryConnector::new(seeded());
    let params = ConnectionParameters::new("db.internal", "  ", "reader", "secret");

    let err = run_query(&connector, QueryRequest::new("SELECT * FROM orders", params))
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Validation);
    assert_eq!(err.to_string(), "Database name must not be empty.");
    assert_eq!(connector.attempts(), 0);
}

#[tokio::test]
async fn test_query_passes_credentials_through_untrimmed() {
    let connector = MemoryConnector::new(seeded());
    let params = ConnectionParameters::new("db.internal", "sales", "reader", " pass word ");

    run_query(&connector, QueryRequest::new("SELECT * FROM orders", params.clone()))
        .await
        .unwrap();

    let opened = connector.opened_with();
    assert_eq!(opened, vec![params]);
    assert_eq!(opened[0].password, " pass word ");
}

#[tokio::test]
async fn test_query_driver_failure_is_sql_error() {
    let db = seeded();
    let connector = MemoryConnector::new(db.clone());

    let err = run_query(&connector, QueryRequest::new("SELECT * FROM nope", params()))
        .await
        .unwrap_err();

    assert_eq!(err.detail(), "SQL error: Invalid object name 'nope'.");
    assert_eq!(db.disposed_engines(), 1);
}

#[tokio::test]
async fn test_query_empty_result() {
    let db = MemoryDatabase::new().with_table("empty", MemoryTable::new(vec!["a".into()], vec![]));
    let connector = MemoryConnector::new(db);

    let records = run_query(&connector, QueryRequest::new(" SELECT * FROM empty ", params()))
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_execute_command_commits_and_closes() {
    let db = MemoryDatabase::new();
    let connector = MemoryConnector::new(db.clone());

    let message = execute_command(&connector, &params(), "DELETE FROM orders WHERE id = 2")
        .await
        .unwrap();

    assert_eq!(
        message,
        "Executed query successfully: DELETE FROM orders WHERE id = 2"
    );
    assert_eq!(db.executed(), vec!["DELETE FROM orders WHERE id = 2"]);
    assert_eq!(db.commits(), 1);
    assert_eq!(db.closed_sessions(), 1);
}

#[tokio::test]
async fn test_execute_command_failure_closes_session() {
    let db = MemoryDatabase::new().fail_statements_containing("DELEET");
    let connector = MemoryConnector::new(db.clone());

    let err = execute_command(&connector, &params(), "DELEET FROM orders")
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Database);
    assert_eq!(err.detail(), "Database error: Incorrect syntax near 'DELEET'.");
    assert_eq!(db.commits(), 0);
    assert_eq!(db.closed_sessions(), 1);
}

#[tokio::test]
async fn test_execute_command_requires_all_parameters() {
    let connector = MemoryConnector::new(MemoryDatabase::new());
    let params = ConnectionParameters::new("", "sales", "loader", "");

    let err = execute_command(&connector, &params, "SELECT 1")
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(err.to_string().ends_with("missing: sql_server, sql_password"));
    assert_eq!(connector.attempts(), 0);
}
