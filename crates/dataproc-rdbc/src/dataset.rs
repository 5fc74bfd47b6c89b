//! In-memory tabular datasets parsed from CSV uploads
//!
//! A [`Dataset`] is a fixed-schema, column-oriented table. Column types are
//! inferred once at load time from the non-missing cells of each column:
//! booleans, then integers, then floats, then ISO dates; anything else is
//! text. Missing cells (empty fields and the usual NA spellings) become
//! `Value::Null` and do not influence inference.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::ops::Range;

use crate::error::{Error, Result};
use crate::types::Value;

/// Cell spellings treated as missing values
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Storage class of a dataset column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Free text
    Text,
    /// 64-bit integers
    Integer,
    /// 64-bit floats
    Float,
    /// True/False
    Boolean,
    /// Calendar date (`YYYY-MM-DD`)
    Date,
}

impl ColumnType {
    /// Whether the column holds text and is subject to wide-string detection
    #[inline]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Text)
    }
}

/// A named, typed column of values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    values: Vec<Value>,
}

impl Column {
    /// Create a column
    pub fn new(name: impl Into<String>, column_type: ColumnType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            column_type,
            values,
        }
    }

    /// Column name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column type
    #[inline]
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// All values, in row order
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Length in characters of the longest stringified non-null value
    pub fn max_text_len(&self) -> usize {
        self.values
            .iter()
            .filter_map(Value::to_text)
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(0)
    }
}

/// An immutable table of equally long columns
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    /// Build a dataset from columns of equal length
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map_or(0, |c| c.values.len());
        if let Some(bad) = columns.iter().find(|c| c.values.len() != row_count) {
            return Err(Error::unexpected(format!(
                "column '{}' has {} values, expected {}",
                bad.name,
                bad.values.len(),
                row_count
            )));
        }
        Ok(Self { columns, row_count })
    }

    /// Parse UTF-8 CSV bytes with a header row
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::dataset("upload is not valid UTF-8", e))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| Error::dataset(format!("could not read CSV header: {}", e), e))?
            .clone();
        if headers.is_empty() || (headers.len() == 1 && headers[0].trim().is_empty()) {
            return Err(Error::unexpected("No columns to parse from file"));
        }

        let names = column_names(headers.iter());
        let width = names.len();
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); width];

        for record in reader.records() {
            let record =
                record.map_err(|e| Error::dataset(format!("could not parse CSV: {}", e), e))?;

            if record.len() == 1 && record[0].is_empty() {
                continue;
            }
            if record.len() > width {
                let line = record.position().map_or(0, |p| p.line());
                return Err(Error::unexpected(format!(
                    "Error tokenizing data. Expected {} fields in line {}, saw {}",
                    width,
                    line,
                    record.len()
                )));
            }

            for (idx, column) in cells.iter_mut().enumerate() {
                let cell = record.get(idx).filter(|c| !NA_VALUES.contains(c));
                column.push(cell.map(str::to_owned));
            }
        }

        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| build_column(name, raw))
            .collect();
        Self::new(columns)
    }

    /// Number of rows
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Whether the dataset has no rows
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Columns in header order
    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column by exact name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Values of one row, in column order
    pub fn row(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.columns.iter().filter_map(move |c| c.values.get(idx))
    }

    /// Rows in `range`, each as a vector of values in column order
    pub fn rows(&self, range: Range<usize>) -> impl Iterator<Item = Vec<&Value>> + '_ {
        let end = range.end.min(self.row_count);
        (range.start..end).map(move |idx| self.row(idx).collect())
    }
}

/// Header names with blanks filled in and duplicates made unique.
///
/// `a,a,` becomes `a, a.1, Unnamed: 2`. A generated suffix never collides
/// with another header: `a,a.1,a` becomes `a, a.1, a.1.1`.
fn column_names<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    headers
        .enumerate()
        .map(|(idx, raw)| {
            let mut name = if raw.trim().is_empty() {
                format!("Unnamed: {}", idx)
            } else {
                raw.to_string()
            };
            let mut count = counts.get(&name).copied().unwrap_or(0);
            while count > 0 {
                counts.insert(name.clone(), count + 1);
                name = format!("{}.{}", name, count);
                count = counts.get(&name).copied().unwrap_or(0);
            }
            counts.insert(name.clone(), count + 1);
            name
        })
        .collect()
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell.trim() {
        "True" | "TRUE" | "true" => Some(true),
        "False" | "FALSE" | "false" => Some(false),
        _ => None,
    }
}

fn parse_date(cell: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(cell.trim(), "%Y-%m-%d").ok()
}

fn infer_type(raw: &[Option<String>]) -> ColumnType {
    let mut present = raw.iter().flatten().peekable();
    if present.peek().is_none() {
        return ColumnType::Text;
    }

    let all = |pred: &dyn Fn(&str) -> bool| raw.iter().flatten().all(|c| pred(c.as_str()));

    if all(&|c| parse_bool(c).is_some()) {
        ColumnType::Boolean
    } else if all(&|c| c.trim().parse::<i64>().is_ok()) {
        ColumnType::Integer
    } else if all(&|c| c.trim().parse::<f64>().is_ok()) {
        ColumnType::Float
    } else if all(&|c| parse_date(c).is_some()) {
        ColumnType::Date
    } else {
        ColumnType::Text
    }
}

fn build_column(name: String, raw: Vec<Option<String>>) -> Column {
    let column_type = infer_type(&raw);
    let values = raw
        .into_iter()
        .map(|cell| match cell {
            None => Value::Null,
            Some(cell) => match column_type {
                ColumnType::Boolean => parse_bool(&cell).into(),
                ColumnType::Integer => cell.trim().parse::<i64>().ok().into(),
                ColumnType::Float => cell.trim().parse::<f64>().ok().into(),
                ColumnType::Date => parse_date(&cell).into(),
                ColumnType::Text => Value::String(cell),
            },
        })
        .collect();
    Column::new(name, column_type, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_dedup_and_unnamed() {
        let names = column_names(["a", "a", " ", "b", "a"].into_iter());
        assert_eq!(names, vec!["a", "a.1", "Unnamed: 2", "b", "a.2"]);
    }

    #[test]
    fn test_column_names_skip_existing_suffixes() {
        let names = column_names(["a", "a.1", "a"].into_iter());
        assert_eq!(names, vec!["a", "a.1", "a.1.1"]);

        let names = column_names(["a", "a", "a.1"].into_iter());
        assert_eq!(names, vec!["a", "a.1", "a.1.1"]);
    }

    #[test]
    fn test_infer_type_order() {
        let col = |cells: &[&str]| -> Vec<Option<String>> {
            cells.iter().map(|c| Some(c.to_string())).collect()
        };
        assert_eq!(infer_type(&col(&["True", "false"])), ColumnType::Boolean);
        assert_eq!(infer_type(&col(&["1", "-2", "007"])), ColumnType::Integer);
        assert_eq!(infer_type(&col(&["1", "2.5"])), ColumnType::Float);
        assert_eq!(
            infer_type(&col(&["2024-01-01", "1999-12-31"])),
            ColumnType::Date
        );
        assert_eq!(infer_type(&col(&["1", "x"])), ColumnType::Text);
        assert_eq!(infer_type(&[None, None]), ColumnType::Text);
    }

    #[test]
    fn test_nulls_do_not_affect_inference() {
        let raw = vec![Some("4".to_string()), None, Some("5".to_string())];
        let column = build_column("n".into(), raw);
        assert_eq!(column.column_type(), ColumnType::Integer);
        assert_eq!(
            column.values(),
            &[Value::Int64(4), Value::Null, Value::Int64(5)]
        );
    }

    #[test]
    fn test_max_text_len_counts_characters() {
        let column = Column::new(
            "t",
            ColumnType::Text,
            vec![
                Value::String("héllo".into()),
                Value::Null,
                Value::String("ab".into()),
            ],
        );
        assert_eq!(column.max_text_len(), 5);
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let err = Dataset::new(vec![
            Column::new("a", ColumnType::Integer, vec![Value::Int64(1)]),
            Column::new("b", ColumnType::Integer, vec![]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("column 'b'"));
    }
}
