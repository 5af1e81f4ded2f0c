use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

pub const TICKETS: &str = "Daily";
pub const SENTIMENT: &str = "Sentiment_Analysis(SI)";
pub const RISK_SCORES: &str = "Risk_Scores(SI)";
pub const DAILY_METRICS: &str = "Daily_Metrics(SI)";
pub const QUALITY_SIGNALS: &str = "Quality_Signals(SI)";
pub const TRENDS: &str = "Trends_Cache(SI)";
pub const DAILY_BRIEF: &str = "Daily_Brief(SI)";
pub const KB_ARTICLES: &str = "testkb";
pub const KB_FAQS: &str = "testfaqs";

/// First data row; row 1 holds the column headers.
pub const FIRST_DATA_ROW: usize = 2;

/// One untyped value as it sits in a source table.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<serde_json::Value> for Cell {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Cell::Empty,
            serde_json::Value::Bool(flag) => Cell::Bool(flag),
            serde_json::Value::Number(number) => {
                number.as_f64().map(Cell::Number).unwrap_or(Cell::Empty)
            }
            serde_json::Value::String(text) => Cell::from(text.as_str()),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(flag) => write!(f, "{flag}"),
            Cell::Number(number) => f.write_str(&format_number(*number)),
            Cell::Text(text) => f.write_str(text),
        }
    }
}

/// Integral values print without a fractional part, the way sheet cells render.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Synchronous access to a point-in-time snapshot of the source tables.
pub trait TableReader {
    /// Rows `from_row..=last_row` (1-based), each padded or cut to `column_count` cells.
    fn read_rows(
        &self,
        table: &str,
        from_row: usize,
        column_count: usize,
    ) -> Result<Vec<Vec<Cell>>, PipelineError>;
}

fn shape_rows(rows: &[Vec<Cell>], from_row: usize, column_count: usize) -> Vec<Vec<Cell>> {
    rows.iter()
        .skip(from_row.saturating_sub(1))
        .map(|row| {
            let mut cells: Vec<Cell> = row.iter().take(column_count).cloned().collect();
            cells.resize(column_count, Cell::Empty);
            cells
        })
        .collect()
}

/// Drops trailing rows with no content, mirroring a sheet's last-row bound.
fn trim_trailing_blank(rows: &mut Vec<Vec<Cell>>) {
    while rows
        .last()
        .is_some_and(|row| row.iter().all(Cell::is_empty))
    {
        rows.pop();
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTables {
    tables: HashMap<String, Vec<Vec<Cell>>>,
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a table; `rows` includes the header row.
    pub fn insert(&mut self, table: impl Into<String>, mut rows: Vec<Vec<Cell>>) {
        trim_trailing_blank(&mut rows);
        self.tables.insert(table.into(), rows);
    }

    pub fn with_table(mut self, table: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        self.insert(table, rows);
        self
    }
}

impl TableReader for MemoryTables {
    fn read_rows(
        &self,
        table: &str,
        from_row: usize,
        column_count: usize,
    ) -> Result<Vec<Vec<Cell>>, PipelineError> {
        let rows = self
            .tables
            .get(table)
            .ok_or_else(|| PipelineError::MissingTable(table.to_string()))?;
        Ok(shape_rows(rows, from_row, column_count))
    }
}

/// A directory holding one `<table>.csv` file per table.
#[derive(Debug, Clone)]
pub struct CsvDirectory {
    root: PathBuf,
}

impl CsvDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}.csv"))
    }
}

pub fn read_csv_rows(path: &Path) -> Result<Vec<Vec<Cell>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::from).collect());
    }
    trim_trailing_blank(&mut rows);
    Ok(rows)
}

impl TableReader for CsvDirectory {
    fn read_rows(
        &self,
        table: &str,
        from_row: usize,
        column_count: usize,
    ) -> Result<Vec<Vec<Cell>>, PipelineError> {
        let path = self.table_path(table);
        if !path.is_file() {
            return Err(PipelineError::MissingTable(table.to_string()));
        }
        let rows = read_csv_rows(&path).map_err(|err| PipelineError::read_failure(table, err))?;
        Ok(shape_rows(&rows, from_row, column_count))
    }
}
