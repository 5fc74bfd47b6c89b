//! Chunked bulk loading of datasets into tables
//!
//! Provides:
//! - ColumnTypeOverride: wide-string storage for long text columns, computed
//!   once over the whole dataset so every chunk sees the same schema
//! - UploadChunk: a contiguous row range written with one insert mode
//! - BulkLoader: writes the chunks in order and commits once at the end
//!
//! There is no atomicity across chunks: if chunk `n` fails, chunks before it
//! have already been written to the session and the error is returned as is.

use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{debug, info};

use crate::connection::{close_session, ConnectionParameters, Connector, IfExists, Session};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::types::Value;

/// Maximum number of rows written per chunk
pub const CHUNK_SIZE: usize = 50_000;

/// Text columns with a value longer than this many characters get wide storage
pub const WIDE_TEXT_THRESHOLD: usize = 225;

/// Storage type used for wide text columns
pub const WIDE_TEXT_TYPE: &str = "VARCHAR(MAX)";

/// Explicit storage types for columns whose inferred type is too narrow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnTypeOverride {
    types: BTreeMap<String, String>,
}

impl ColumnTypeOverride {
    /// Scan the text columns of `dataset` and mark every column whose longest
    /// value exceeds `threshold` characters for [`WIDE_TEXT_TYPE`] storage
    pub fn compute(dataset: &Dataset, threshold: usize) -> Self {
        let types = dataset
            .columns()
            .iter()
            .filter(|c| c.column_type().is_text())
            .filter(|c| c.max_text_len() > threshold)
            .map(|c| (c.name().to_string(), WIDE_TEXT_TYPE.to_string()))
            .collect();
        Self { types }
    }

    /// Storage type override for a column, if any
    pub fn get(&self, column: &str) -> Option<&str> {
        self.types.get(column).map(String::as_str)
    }

    /// Whether a column is overridden
    pub fn contains(&self, column: &str) -> bool {
        self.types.contains_key(column)
    }

    /// Number of overridden columns
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no column is overridden
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Overridden columns and their storage types, by column name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.types.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// One contiguous slice of a dataset written with a single insert mode
#[derive(Debug, Clone)]
pub struct UploadChunk<'a> {
    /// Source dataset
    pub dataset: &'a Dataset,
    /// Row range within the dataset
    pub rows: Range<usize>,
    /// Target table (`table` or `schema.table`)
    pub table: &'a str,
    /// What to do if the table exists
    pub mode: IfExists,
    /// Storage type overrides, identical for every chunk of an upload
    pub overrides: &'a ColumnTypeOverride,
    /// Position of this chunk in the upload (0-based)
    pub index: usize,
}

impl UploadChunk<'_> {
    /// Number of rows in this chunk
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether this chunk has no rows
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of the rows in this chunk, each in column order
    pub fn row_values(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        self.dataset.rows(self.rows.clone())
    }
}

/// Split `total_rows` into consecutive ranges of at most `chunk_size` rows.
///
/// The first range carries `mode`, every later range [`IfExists::Append`].
pub fn plan_chunks(
    total_rows: usize,
    chunk_size: usize,
    mode: IfExists,
) -> Vec<(Range<usize>, IfExists)> {
    let chunk_size = chunk_size.max(1);
    (0..total_rows)
        .step_by(chunk_size)
        .enumerate()
        .map(|(idx, start)| {
            let end = (start + chunk_size).min(total_rows);
            let mode = if idx == 0 { mode } else { IfExists::Append };
            (start..end, mode)
        })
        .collect()
}

/// Result of an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The dataset had no rows; nothing was written
    NothingToDo,
    /// Every chunk was written and committed
    Uploaded {
        /// Rows written
        rows: u64,
        /// Chunks written
        chunks: usize,
    },
}

impl UploadOutcome {
    /// Whether rows were written
    pub fn is_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }
}

/// Writes datasets to tables in bounded chunks
#[derive(Debug, Clone)]
pub struct BulkLoader {
    chunk_size: usize,
    wide_text_threshold: usize,
}

impl Default for BulkLoader {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            wide_text_threshold: WIDE_TEXT_THRESHOLD,
        }
    }
}

impl BulkLoader {
    /// Create a loader with the standard chunk size and threshold
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk size
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Rows per chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Write `dataset` into `table` through `session`, then commit.
    ///
    /// The first chunk uses `mode`; later chunks append. An empty dataset
    /// returns [`UploadOutcome::NothingToDo`] without touching the session.
    pub async fn upload(
        &self,
        session: &mut dyn Session,
        dataset: &Dataset,
        table: &str,
        mode: IfExists,
    ) -> Result<UploadOutcome> {
        if dataset.is_empty() {
            info!("No rows to upload to {}", table);
            return Ok(UploadOutcome::NothingToDo);
        }

        let overrides = ColumnTypeOverride::compute(dataset, self.wide_text_threshold);
        if !overrides.is_empty() {
            debug!(
                "Using {} for columns: {}",
                WIDE_TEXT_TYPE,
                overrides.iter().map(|(c, _)| c).collect::<Vec<_>>().join(", ")
            );
        }

        let plan = plan_chunks(dataset.row_count(), self.chunk_size, mode);
        info!(
            "Uploading {} rows to {} in {} chunk(s) (if_exists={})",
            dataset.row_count(),
            table,
            plan.len(),
            mode
        );

        let mut rows = 0u64;
        for (index, (range, chunk_mode)) in plan.iter().cloned().enumerate() {
            let chunk = UploadChunk {
                dataset,
                rows: range,
                table,
                mode: chunk_mode,
                overrides: &overrides,
                index,
            };
            debug!(
                "Writing chunk {} ({} rows, if_exists={})",
                index,
                chunk.len(),
                chunk_mode
            );
            rows += session.write_chunk(&chunk).await?;
        }

        session.commit().await?;
        info!("Uploaded {} rows to {}", rows, table);

        Ok(UploadOutcome::Uploaded {
            rows,
            chunks: plan.len(),
        })
    }
}

/// Parse an uploaded CSV and load it into `table`.
///
/// The upload is parsed before connecting, so malformed files never open a
/// session. The session is closed on every path once it is open.
pub async fn process_and_upload(
    connector: &dyn Connector,
    params: &ConnectionParameters,
    csv: &[u8],
    table: &str,
    mode: IfExists,
) -> Result<UploadOutcome> {
    let dataset = Dataset::from_csv(csv)?;
    debug!(
        "Parsed upload: {} rows, {} columns",
        dataset.row_count(),
        dataset.column_count()
    );

    let mut session = connector.open_session(params).await?;
    let outcome = BulkLoader::new()
        .upload(session.as_mut(), &dataset, table, mode)
        .await;
    close_session(session).await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Column, ColumnType};

    fn text_dataset(name: &str, len: usize) -> Dataset {
        Dataset::new(vec![
            Column::new(
                name,
                ColumnType::Text,
                vec![Value::String("x".repeat(len)), Value::String("short".into())],
            ),
            Column::new(
                "n",
                ColumnType::Integer,
                vec![Value::Int64(1), Value::Int64(2)],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_override_threshold_is_exclusive() {
        let at = ColumnTypeOverride::compute(&text_dataset("notes", 225), WIDE_TEXT_THRESHOLD);
        assert!(at.is_empty());

        let over = ColumnTypeOverride::compute(&text_dataset("notes", 226), WIDE_TEXT_THRESHOLD);
        assert_eq!(over.get("notes"), Some(WIDE_TEXT_TYPE));
        assert!(!over.contains("n"));
    }

    #[test]
    fn test_plan_chunks_sizes_and_modes() {
        let plan = plan_chunks(120_000, CHUNK_SIZE, IfExists::Replace);
        let sizes: Vec<usize> = plan.iter().map(|(r, _)| r.len()).collect();
        assert_eq!(sizes, vec![50_000, 50_000, 20_000]);
        assert_eq!(plan[0].1, IfExists::Replace);
        assert!(plan[1..].iter().all(|(_, m)| *m == IfExists::Append));
        assert_eq!(plan[2].0, 100_000..120_000);
    }

    #[test]
    fn test_plan_chunks_edges() {
        assert!(plan_chunks(0, CHUNK_SIZE, IfExists::Replace).is_empty());

        let exact = plan_chunks(50_000, CHUNK_SIZE, IfExists::Fail);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0], (0..50_000, IfExists::Fail));

        let single = plan_chunks(3, 0, IfExists::Append);
        assert_eq!(single.len(), 3);
    }
}
