//! Query execution returning JSON records

use tracing::info;

use crate::connection::{dispose_engine, ConnectionParameters, Connector};
use crate::error::{Error, Result};
use crate::types::{Record, Row};

/// A query together with the database it runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Query text
    pub command: String,
    /// Target database
    pub params: ConnectionParameters,
}

impl QueryRequest {
    /// Create a query request
    pub fn new(command: impl Into<String>, params: ConnectionParameters) -> Self {
        Self {
            command: command.into(),
            params,
        }
    }

    /// Reject blank fields.
    ///
    /// Fields are checked in the order command, server, database, user,
    /// password; the first one that is empty after trimming fails with
    /// `"<name> must not be empty."`. Values are passed on untouched.
    pub fn validate(&self) -> Result<()> {
        required("SQL command", &self.command)?;
        required("SQL Server", &self.params.server)?;
        required("Database name", &self.params.database)?;
        required("SQL user", &self.params.username)?;
        required("SQL password", &self.params.password)
    }
}

fn required(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{} must not be empty.", name)));
    }
    Ok(())
}

/// Validate the request, run the query on a fresh engine and return every
/// row of the first result set as a record, in row order
pub async fn run_query(connector: &dyn Connector, request: QueryRequest) -> Result<Vec<Record>> {
    request.validate()?;

    let mut engine = connector.open_engine(&request.params).await?;
    let rows = engine.read_sql(&request.command).await;
    dispose_engine(engine).await;

    let records: Vec<Record> = rows?.into_iter().map(Row::into_record).collect();
    info!(
        "Query on {} returned {} rows",
        request.params.target(),
        records.len()
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn request(command: &str, server: &str, db: &str, user: &str, pw: &str) -> QueryRequest {
        QueryRequest::new(command, ConnectionParameters::new(server, db, user, pw))
    }

    #[test]
    fn test_validate_keeps_values_untouched() {
        let req = request(" SELECT 1 ", " db.local ", "sales ", " ro", " pass word ");
        req.validate().unwrap();
        assert_eq!(req.command, " SELECT 1 ");
        assert_eq!(req.params.password, " pass word ");
    }

    #[test]
    fn test_validate_reports_first_blank_field() {
        let err = request("   ", "", "", "", "").validate().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.to_string(), "SQL command must not be empty.");

        let cases = [
            (request("q", " ", "d", "u", "p"), "SQL Server must not be empty."),
            (request("q", "s", "", "u", "p"), "Database name must not be empty."),
            (request("q", "s", "d", "\t", "p"), "SQL user must not be empty."),
            (request("q", "s", "d", "u", " "), "SQL password must not be empty."),
        ];
        for (req, expected) in cases {
            assert_eq!(req.validate().unwrap_err().to_string(), expected);
        }
    }
}
