//! Schema inspection.
//!
//! Infers variable types from a preview of the dataset and flags columns
//! that look like they hold gender.

use super::{Cell, Column, Dataset};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Rows used for type inference.
pub const PREVIEW_ROWS: usize = 200;

const GENDER_KEYWORDS: [&str; 11] = [
    "gender",
    "sex",
    "male",
    "female",
    "man",
    "woman",
    "gend",
    "sexe",
    "geschlecht",
    "género",
    "sexo",
];

const GENDER_VALUES: [&str; 16] = [
    "male",
    "female",
    "m",
    "f",
    "man",
    "woman",
    "men",
    "women",
    "masculine",
    "feminine",
    "other",
    "non-binary",
    "transgender",
    "prefer not to say",
    "unknown",
    "missing",
];

const BOOLEAN_VALUES: [&str; 4] = ["true", "false", "yes", "no"];

/// Inferred kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Continuous,
    Categorical,
    Boolean,
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableType::Continuous => write!(f, "continuous"),
            VariableType::Categorical => write!(f, "categorical"),
            VariableType::Boolean => write!(f, "boolean"),
        }
    }
}

/// Summary of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    pub name: String,
    pub variable_type: VariableType,
    pub unique_n: usize,
    pub missing_pct: f64,
    pub sample_values: Vec<String>,
}

/// Schema plus gender-candidate columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub rows: usize,
    pub variables: Vec<VariableInfo>,
    pub gender_candidates: Vec<String>,
}

/// Inspect the first [`PREVIEW_ROWS`] rows of a dataset.
pub fn infer_schema(dataset: &Dataset) -> SchemaInfo {
    let preview_len = dataset.n_rows().min(PREVIEW_ROWS);
    let keep: Vec<bool> = (0..dataset.n_rows()).map(|r| r < preview_len).collect();
    let preview = dataset.filter_rows(&keep);

    let variables = preview
        .columns()
        .iter()
        .map(|col| VariableInfo {
            name: col.name.clone(),
            variable_type: infer_variable_type(col),
            unique_n: distinct_values(col).len(),
            missing_pct: crate::stats::round_to(
                percentage(col.missing_count(), col.cells.len()),
                2,
            ),
            sample_values: sample_values(col, 10),
        })
        .collect();

    SchemaInfo {
        rows: dataset.n_rows(),
        variables,
        gender_candidates: gender_candidates(&preview),
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Distinct present values with their counts, in first-seen order.
fn distinct_values(col: &Column) -> Vec<(Cell, usize)> {
    let mut counts: Vec<(Cell, usize)> = Vec::new();
    for cell in col.cells.iter().filter(|c| !c.is_missing()) {
        match counts.iter_mut().find(|(c, _)| c == cell) {
            Some((_, n)) => *n += 1,
            None => counts.push((cell.clone(), 1)),
        }
    }
    counts
}

/// Infer a column's type from its present values.
pub fn infer_variable_type(col: &Column) -> VariableType {
    let present: Vec<&Cell> = col.cells.iter().filter(|c| !c.is_missing()).collect();
    if present.is_empty() {
        return VariableType::Categorical;
    }

    let all_boolean = present.iter().all(|c| match c {
        Cell::Text(s) => BOOLEAN_VALUES.contains(&s.to_lowercase().as_str()),
        _ => false,
    });
    if all_boolean {
        return VariableType::Boolean;
    }

    if col.is_numeric() {
        let unique = distinct_values(col).len();
        let ratio = unique as f64 / col.cells.len() as f64;
        if ratio < 0.1 && unique <= 20 {
            return VariableType::Categorical;
        }
        return VariableType::Continuous;
    }

    VariableType::Categorical
}

/// Up to `max` example values: sorted distinct values for numeric
/// columns, most frequent first for everything else.
fn sample_values(col: &Column, max: usize) -> Vec<String> {
    let mut distinct = distinct_values(col);
    if col.is_numeric() {
        distinct.sort_by(|(a, _), (b, _)| a.total_cmp(b));
    } else {
        distinct.sort_by(|(_, na), (_, nb)| nb.cmp(na));
    }
    distinct
        .into_iter()
        .take(max)
        .map(|(c, _)| c.to_string())
        .collect()
}

/// Columns whose name or values suggest they record gender.
pub fn gender_candidates(dataset: &Dataset) -> Vec<String> {
    dataset
        .columns()
        .iter()
        .filter(|col| {
            GENDER_KEYWORDS.iter().any(|k| col.name.contains(k)) || has_gender_values(col)
        })
        .map(|col| col.name.clone())
        .collect()
}

fn has_gender_values(col: &Column) -> bool {
    let seen: HashSet<String> = col
        .cells
        .iter()
        .filter_map(|c| match c {
            Cell::Text(s) => Some(s.to_lowercase()),
            _ => None,
        })
        .collect();
    seen.iter().any(|v| GENDER_VALUES.contains(&v.as_str()))
}
