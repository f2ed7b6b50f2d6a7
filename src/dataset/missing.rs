//! Missing-data handling.
//!
//! Applies the request's missing policy, then any per-variable imputation.

use super::{Cell, Dataset};
use crate::models::{ImputeConfig, ImputeMethod, MissingPolicy};
use crate::stats;
use tracing::{debug, warn};

/// Level assigned to missing categorical cells under the flag policy.
pub const MISSING_LEVEL: &str = "missing";

/// Apply `policy` and then `impute` to a copy of `dataset`.
///
/// `flag_columns` are the categorical variables whose missing cells become
/// the explicit level [`MISSING_LEVEL`] under [`MissingPolicy::Flag`].
pub fn apply_missing_policy(
    dataset: &Dataset,
    policy: MissingPolicy,
    impute: Option<&ImputeConfig>,
    flag_columns: &[String],
) -> Dataset {
    let mut out = match policy {
        MissingPolicy::Listwise => {
            let keep: Vec<bool> = (0..dataset.n_rows())
                .map(|row| !dataset.row_has_missing(row))
                .collect();
            let result = dataset.filter_rows(&keep);
            debug!(
                "Listwise deletion kept {} of {} rows",
                result.n_rows(),
                dataset.n_rows()
            );
            result
        }
        MissingPolicy::Pairwise => dataset.clone(),
        MissingPolicy::Flag => {
            let mut result = dataset.clone();
            for name in flag_columns {
                if let Some(column) = result.column_mut(name) {
                    for cell in column.cells.iter_mut().filter(|c| c.is_missing()) {
                        *cell = Cell::Text(MISSING_LEVEL.to_string());
                    }
                }
            }
            result
        }
    };

    if let Some(impute) = impute {
        for (var, method) in impute.assignments() {
            impute_column(&mut out, &var, method);
        }
    }

    out
}

/// Fill missing cells of one column. Columns with no present values, or
/// mean/median requested on a non-numeric column, are left untouched.
fn impute_column(dataset: &mut Dataset, var: &str, method: ImputeMethod) {
    let Some(column) = dataset.column_mut(var) else {
        warn!("Cannot impute '{}': column not found", var);
        return;
    };
    if column.missing_count() == 0 {
        return;
    }

    let fill = match method {
        ImputeMethod::Mean | ImputeMethod::Median => {
            if !column.is_numeric() {
                warn!("Cannot impute {:?} for non-numeric column '{}'", method, var);
                return;
            }
            let values = column.numbers();
            let v = if method == ImputeMethod::Mean {
                stats::mean(&values)
            } else {
                stats::median(&values)
            };
            v.map(Cell::Number)
        }
        ImputeMethod::Mode => mode(&column.cells),
    };

    match fill {
        Some(value) => {
            debug!("Imputing {} missing value(s) in '{}' with {}", column.missing_count(), var, value);
            for cell in column.cells.iter_mut().filter(|c| c.is_missing()) {
                *cell = value.clone();
            }
        }
        None => debug!("No observed values in '{}', skipping imputation", var),
    }
}

/// Most frequent present value; ties go to the smallest value.
fn mode(cells: &[Cell]) -> Option<Cell> {
    let mut counts: Vec<(Cell, usize)> = Vec::new();
    for cell in cells.iter().filter(|c| !c.is_missing()) {
        match counts.iter_mut().find(|(c, _)| c == cell) {
            Some((_, n)) => *n += 1,
            None => counts.push((cell.clone(), 1)),
        }
    }
    counts
        .into_iter()
        .max_by(|(a, na), (b, nb)| na.cmp(nb).then_with(|| b.total_cmp(a)))
        .map(|(c, _)| c)
}
