//! HTTP server for the DataProcessor API
//!
//! Routes:
//! - `POST /DataProcessor/process_and_upload_data`: CSV upload into a table
//! - `GET /DataProcessor/execute_query`: run one SQL command
//! - `GET /DataProcessor/get_query_output`: run a query, rows as JSON
//! - `GET /health`
//!
//! Every request opens its own connection; nothing is shared between
//! requests except the connector.

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection, DefaultBodyLimit, Multipart, Query,
        State,
    },
    routing::{get, post},
    Json, Router,
};
use dataproc_rdbc::prelude::*;
use serde::{Deserialize, Serialize};
use std::result::Result;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ApiError;

/// Multipart field carrying the uploaded file
pub const UPLOAD_FIELD: &str = "data";

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    /// Opens sessions and engines for each request
    pub connector: Arc<dyn Connector>,
}

/// DataProcessor HTTP server
pub struct DataProcessorServer {
    state: ServerState,
    config: ServerConfig,
}

impl DataProcessorServer {
    /// Create a server using `connector` for all database access
    pub fn new(connector: Arc<dyn Connector>, config: ServerConfig) -> Self {
        Self {
            state: ServerState { connector },
            config,
        }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route(
                "/DataProcessor/process_and_upload_data",
                post(process_and_upload_data),
            )
            .route("/DataProcessor/execute_query", get(execute_query))
            .route("/DataProcessor/get_query_output", get(get_query_output))
            .layer(DefaultBodyLimit::max(self.config.max_upload_bytes))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server until Ctrl+C or SIGTERM
    pub async fn run(self) -> anyhow::Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.config.bind).await?;
        info!("DataProcessor server listening on {}", self.config.bind);
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("DataProcessor server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
struct UploadParams {
    sql_server: String,
    database: String,
    sql_user: String,
    sql_password: String,
    table_name: String,
    #[serde(default = "default_if_exists")]
    if_exists: String,
}

fn default_if_exists() -> String {
    IfExists::default().as_str().to_string()
}

#[derive(Deserialize)]
struct CommandParams {
    sql_server: String,
    database: String,
    sql_user: String,
    sql_password: String,
    command: String,
}

impl CommandParams {
    fn connection(&self) -> ConnectionParameters {
        ConnectionParameters::new(
            &self.sql_server,
            &self.database,
            &self.sql_user,
            &self.sql_password,
        )
    }
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|e| ApiError::unprocessable(e.body_text()))
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn process_and_upload_data(
    State(state): State<ServerState>,
    query: Result<Query<UploadParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let params = query_params(query)?;
    let mode: IfExists = params.if_exists.parse()?;
    let mut multipart = multipart.map_err(|e| ApiError::unprocessable(e.body_text()))?;

    let mut data = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::Request {
        status: e.status(),
        detail: e.body_text(),
    })? {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field.bytes().await.map_err(|e| ApiError::Request {
                status: e.status(),
                detail: e.body_text(),
            })?;
            data = Some(bytes);
            break;
        }
    }
    let data = data
        .ok_or_else(|| ApiError::unprocessable(format!("Field required: {}", UPLOAD_FIELD)))?;

    let connection = ConnectionParameters::new(
        params.sql_server,
        params.database,
        params.sql_user,
        params.sql_password,
    );
    let outcome = process_and_upload(
        state.connector.as_ref(),
        &connection,
        &data,
        &params.table_name,
        mode,
    )
    .await?;

    match outcome {
        UploadOutcome::NothingToDo => Ok(MessageResponse::new("No data to upload")),
        UploadOutcome::Uploaded { rows, .. } => {
            info!(
                "Data uploaded successfully to table {} ({} rows)",
                params.table_name, rows
            );
            Ok(MessageResponse::new("Data uploaded successfully"))
        }
    }
}

async fn execute_query(
    State(state): State<ServerState>,
    query: Result<Query<CommandParams>, QueryRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let params = query_params(query)?;
    let message =
        execute_command(state.connector.as_ref(), &params.connection(), &params.command).await?;
    info!("{}", message);
    Ok(MessageResponse::new(message))
}

async fn get_query_output(
    State(state): State<ServerState>,
    query: Result<Query<CommandParams>, QueryRejection>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let params = query_params(query)?;
    let request = QueryRequest::new(params.command.clone(), params.connection());
    let records = run_query(state.connector.as_ref(), request).await?;
    Ok(Json(records))
}
