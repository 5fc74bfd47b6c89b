//! SQL Server statement generation for bulk writes
//!
//! Identifiers are always bracket-quoted; values are always bound as
//! parameters. The only literals interpolated into statement text are object
//! names passed to `OBJECT_ID`, which are escaped.

use std::fmt;

use crate::dataset::{Column, ColumnType};
use crate::error::{Error, Result};
use crate::loader::ColumnTypeOverride;

/// Most rows SQL Server accepts in one `INSERT ... VALUES` statement
pub const MAX_ROWS_PER_INSERT: usize = 1000;

/// Bound parameters per statement, kept below the server's 2100 limit
pub const MAX_PARAMS_PER_STATEMENT: usize = 2000;

/// Storage type for text columns without an override
pub const DEFAULT_TEXT_TYPE: &str = "VARCHAR(255)";

/// Escape a value for use inside a single-quoted SQL string literal.
///
/// Prefer bound parameters; this is only for object names handed to
/// metadata functions.
pub fn escape_string_literal(value: &str) -> String {
    if !value.contains('\'') {
        return value.to_string();
    }
    value.replace('\'', "''")
}

/// A possibly schema-qualified table name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    /// Schema, when given as `schema.table`
    pub schema: Option<String>,
    /// Table name
    pub name: String,
}

impl TableName {
    /// Parse `table` or `schema.table`
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (schema, name) = match raw.split_once('.') {
            Some((schema, name)) => (Some(schema.trim()), name.trim()),
            None => (None, raw),
        };
        if name.is_empty() || schema.is_some_and(str::is_empty) {
            return Err(Error::unexpected(format!("Invalid table name '{}'", raw)));
        }
        Ok(Self {
            schema: schema.map(str::to_owned),
            name: name.to_owned(),
        })
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// SQL Server dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl SqlServerDialect {
    /// Quote an identifier with brackets, doubling any `]`
    pub fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    /// Parameter placeholder for a 1-based index
    pub fn placeholder(&self, index: usize) -> String {
        format!("@P{}", index)
    }

    /// Fully quoted table reference
    pub fn quote_table(&self, table: &TableName) -> String {
        match &table.schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(&table.name)
            ),
            None => self.quote_identifier(&table.name),
        }
    }

    /// Storage type for a dataset column
    pub fn native_type<'a>(&self, column: &Column, overrides: &'a ColumnTypeOverride) -> &'a str {
        if let Some(wide) = overrides.get(column.name()) {
            return wide;
        }
        match column.column_type() {
            ColumnType::Integer => "BIGINT",
            ColumnType::Float => "FLOAT",
            ColumnType::Boolean => "BIT",
            ColumnType::Date => "DATE",
            ColumnType::Text => DEFAULT_TEXT_TYPE,
        }
    }

    fn object_id(&self, table: &TableName) -> String {
        format!(
            "OBJECT_ID(N'{}', N'U')",
            escape_string_literal(&self.quote_table(table))
        )
    }

    /// Query returning one row with 1 if the table exists, else 0
    pub fn table_exists_sql(&self, table: &TableName) -> String {
        format!(
            "SELECT CASE WHEN {} IS NULL THEN 0 ELSE 1 END",
            self.object_id(table)
        )
    }

    /// Drop the table if it exists
    pub fn drop_table_sql(&self, table: &TableName) -> String {
        format!(
            "IF {} IS NOT NULL DROP TABLE {}",
            self.object_id(table),
            self.quote_table(table)
        )
    }

    /// Create the table; every column is nullable
    pub fn create_table_sql(
        &self,
        table: &TableName,
        columns: &[Column],
        overrides: &ColumnTypeOverride,
    ) -> String {
        let defs: Vec<String> = columns
            .iter()
            .map(|c| {
                format!(
                    "{} {} NULL",
                    self.quote_identifier(c.name()),
                    self.native_type(c, overrides)
                )
            })
            .collect();
        format!(
            "CREATE TABLE {} ({})",
            self.quote_table(table),
            defs.join(", ")
        )
    }

    /// Create the table unless it already exists
    pub fn create_table_if_missing_sql(
        &self,
        table: &TableName,
        columns: &[Column],
        overrides: &ColumnTypeOverride,
    ) -> String {
        format!(
            "IF {} IS NULL {}",
            self.object_id(table),
            self.create_table_sql(table, columns, overrides)
        )
    }

    /// Rows that fit in one insert for a table of `column_count` columns
    pub fn rows_per_insert(&self, column_count: usize) -> usize {
        (MAX_PARAMS_PER_STATEMENT / column_count.max(1)).clamp(1, MAX_ROWS_PER_INSERT)
    }

    /// Multi-row parameterised insert with `@P1..` placeholders, row-major
    pub fn insert_sql(&self, table: &TableName, columns: &[&str], rows: usize) -> String {
        let cols: Vec<String> = columns.iter().map(|c| self.quote_identifier(c)).collect();
        let width = columns.len();
        let tuples: Vec<String> = (0..rows)
            .map(|row| {
                let params: Vec<String> = (1..=width)
                    .map(|col| self.placeholder(row * width + col))
                    .collect();
                format!("({})", params.join(", "))
            })
            .collect();
        format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.quote_table(table),
            cols.join(", "),
            tuples.join(", ")
        )
    }
}
