//! In-memory tabular dataset.
//!
//! Columns are stored column-major with lowercase names. Transform steps
//! (gender normalization, missing-data handling) return new copies; a
//! loaded dataset is never mutated in place.

pub mod gender;
pub mod loader;
pub mod missing;
pub mod schema;

pub use gender::GenderNormalizer;
pub use loader::load_csv;
pub use missing::apply_missing_policy;

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Errors raised while loading a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("file is {size_mb:.1}MB, larger than the {limit_mb}MB limit")]
    TooLarge { size_mb: f64, limit_mb: u64 },

    #[error("file has no columns")]
    NoColumns,

    #[error("file appears to be empty or could not be parsed")]
    Empty,

    #[error("row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A single value of the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

const MISSING_TOKENS: [&str; 6] = ["", "na", "n/a", "nan", "null", "none"];

impl Cell {
    /// Parse a raw field: missing tokens, finite numbers, otherwise text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_TOKENS.contains(&trimmed.to_lowercase().as_str()) {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Text form of a present value; `None` for missing cells.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            Cell::Number(v) => Some(v.to_string()),
            Cell::Text(s) => Some(s.clone()),
        }
    }

    /// Total order used for mode tie-breaking and level sorting:
    /// missing < numbers (numerically) < text (lexicographically).
    pub fn total_cmp(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Missing, Cell::Missing) => Ordering::Equal,
            (Cell::Missing, _) => Ordering::Less,
            (_, Cell::Missing) => Ordering::Greater,
            (Cell::Number(a), Cell::Number(b)) => a.total_cmp(b),
            (Cell::Number(_), Cell::Text(_)) => Ordering::Less,
            (Cell::Text(_), Cell::Number(_)) => Ordering::Greater,
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => write!(f, ""),
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: &str, cells: Vec<Cell>) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            cells,
        }
    }

    /// True when every present value is numeric (and at least one is present).
    pub fn is_numeric(&self) -> bool {
        let mut present = self.cells.iter().filter(|c| !c.is_missing()).peekable();
        present.peek().is_some() && present.all(|c| matches!(c, Cell::Number(_)))
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_missing()).count()
    }

    /// Numeric values of the non-missing cells, in row order.
    pub fn numbers(&self) -> Vec<f64> {
        self.cells.iter().filter_map(Cell::as_f64).collect()
    }
}

/// The table one analysis session works on.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Display name (usually the file name).
    pub name: String,
    columns: Vec<Column>,
}

impl Dataset {
    /// Build a dataset; column names are lowercased. All columns must have
    /// the same length.
    pub fn new(name: &str, columns: Vec<Column>) -> Self {
        debug_assert!(
            columns.windows(2).all(|w| w[0].cells.len() == w[1].cells.len()),
            "columns must have equal length"
        );
        Self {
            name: name.to_string(),
            columns,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.cells.len()).unwrap_or(0)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Whether any cell of the given row is missing.
    pub fn row_has_missing(&self, row: usize) -> bool {
        self.columns.iter().any(|c| c.cells[row].is_missing())
    }

    /// Copy of the dataset holding only rows where `keep[row]` is true.
    pub fn filter_rows(&self, keep: &[bool]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|col| Column {
                name: col.name.clone(),
                cells: col
                    .cells
                    .iter()
                    .zip(keep)
                    .filter(|(_, k)| **k)
                    .map(|(c, _)| c.clone())
                    .collect(),
            })
            .collect();
        Dataset {
            name: self.name.clone(),
            columns,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_dataset() -> Dataset {
    Dataset::new(
        "sample.csv",
        vec![
            Column::new(
                "Gender",
                vec![
                    Cell::Text("F".into()),
                    Cell::Text("M".into()),
                    Cell::Text("M".into()),
                    Cell::Missing,
                ],
            ),
            Column::new(
                "Age",
                vec![
                    Cell::Number(30.0),
                    Cell::Missing,
                    Cell::Number(40.0),
                    Cell::Number(50.0),
                ],
            ),
            Column::new(
                "Region",
                vec![
                    Cell::Text("north".into()),
                    Cell::Text("south".into()),
                    Cell::Missing,
                    Cell::Text("north".into()),
                ],
            ),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_parse() {
        assert_eq!(Cell::parse("  "), Cell::Missing);
        assert_eq!(Cell::parse("NA"), Cell::Missing);
        assert_eq!(Cell::parse("nan"), Cell::Missing);
        assert_eq!(Cell::parse("3.5"), Cell::Number(3.5));
        assert_eq!(Cell::parse(" female "), Cell::Text("female".into()));
        assert_eq!(Cell::parse("inf"), Cell::Text("inf".into()));
    }

    #[test]
    fn test_column_names_are_lowercased() {
        let ds = sample_dataset();
        assert_eq!(ds.column_names(), vec!["gender", "age", "region"]);
        assert!(ds.has_column("age"));
        assert!(!ds.has_column("Age"));
        assert_eq!(ds.n_rows(), 4);
    }

    #[test]
    fn test_filter_rows() {
        let ds = sample_dataset();
        let filtered = ds.filter_rows(&[true, false, true, false]);
        assert_eq!(filtered.n_rows(), 2);
        assert_eq!(filtered.column("age").unwrap().numbers(), vec![30.0, 40.0]);
    }

    #[test]
    fn test_is_numeric() {
        let ds = sample_dataset();
        assert!(ds.column("age").unwrap().is_numeric());
        assert!(!ds.column("region").unwrap().is_numeric());
        let empty = Column::new("x", vec![Cell::Missing]);
        assert!(!empty.is_numeric());
    }

    #[test]
    fn test_cell_total_cmp() {
        assert_eq!(Cell::Number(1.0).total_cmp(&Cell::Number(2.0)), Ordering::Less);
        assert_eq!(
            Cell::Number(9.0).total_cmp(&Cell::Text("a".into())),
            Ordering::Less
        );
        assert_eq!(
            Cell::Text("b".into()).total_cmp(&Cell::Text("a".into())),
            Ordering::Greater
        );
    }
}
