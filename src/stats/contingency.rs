//! Two-way frequency tables.

use super::{StatError, StatResult};

/// Sample odds ratio `(a d) / (b c)` of 2x2 cells. The products are taken
/// in `f64` so large counts cannot overflow.
pub fn cross_ratio(a: u64, b: u64, c: u64, d: u64) -> f64 {
    (a as f64 * d as f64) / (b as f64 * c as f64)
}

/// Observed counts with rows = variable levels and columns = groups.
#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyTable {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    /// Build a table from row-major counts. Every row must have one count
    /// per column label.
    pub fn new(row_labels: Vec<String>, col_labels: Vec<String>, counts: Vec<Vec<u64>>) -> Self {
        debug_assert_eq!(row_labels.len(), counts.len());
        debug_assert!(counts.iter().all(|r| r.len() == col_labels.len()));
        Self {
            row_labels,
            col_labels,
            counts,
        }
    }

    /// Cross-tabulate paired (row, column) observations. Labels missing
    /// from `row_labels` or `col_labels` are ignored.
    pub fn from_pairs<'a, I>(row_labels: Vec<String>, col_labels: Vec<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut counts = vec![vec![0u64; col_labels.len()]; row_labels.len()];
        for (row, col) in pairs {
            let r = row_labels.iter().position(|l| l == row);
            let c = col_labels.iter().position(|l| l == col);
            if let (Some(r), Some(c)) = (r, c) {
                counts[r][c] += 1;
            }
        }
        Self::new(row_labels, col_labels, counts)
    }

    pub fn n_rows(&self) -> usize {
        self.counts.len()
    }

    pub fn n_cols(&self) -> usize {
        self.col_labels.len()
    }

    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.counts[row][col]
    }

    pub fn counts(&self) -> &[Vec<u64>] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn row_totals(&self) -> Vec<u64> {
        self.counts.iter().map(|r| r.iter().sum()).collect()
    }

    pub fn col_totals(&self) -> Vec<u64> {
        (0..self.n_cols())
            .map(|c| self.counts.iter().map(|r| r[c]).sum())
            .collect()
    }

    pub fn is_two_by_two(&self) -> bool {
        self.n_rows() == 2 && self.n_cols() == 2
    }

    /// Expected counts under independence.
    pub fn expected(&self) -> Vec<Vec<f64>> {
        let total = self.total() as f64;
        let rows = self.row_totals();
        let cols = self.col_totals();
        rows.iter()
            .map(|&r| {
                cols.iter()
                    .map(|&c| if total > 0.0 { r as f64 * c as f64 / total } else { 0.0 })
                    .collect()
            })
            .collect()
    }

    /// Smallest expected count; `None` for an empty table.
    pub fn min_expected(&self) -> Option<f64> {
        self.expected()
            .into_iter()
            .flatten()
            .min_by(f64::total_cmp)
    }

    /// The four cells `(a, b, c, d)` of a 2x2 table in row-major order.
    pub fn cells_2x2(&self) -> StatResult<(u64, u64, u64, u64)> {
        if !self.is_two_by_two() {
            return Err(StatError::NotTwoByTwo {
                rows: self.n_rows(),
                cols: self.n_cols(),
            });
        }
        Ok((
            self.counts[0][0],
            self.counts[0][1],
            self.counts[1][0],
            self.counts[1][1],
        ))
    }
}
