//! Gender normalization.
//!
//! Maps raw gender labels onto the canonical category set. The mapping is
//! total: any value not listed (including missing cells) becomes
//! [`GenderCategory::Missing`].

use super::{Cell, Column, Dataset};
use crate::models::{GenderCategory, GenderMapping};
use std::collections::HashMap;
use tracing::debug;

/// Lookup built from an ordered mapping list. Later entries win on
/// duplicate raw values.
#[derive(Debug, Clone)]
pub struct GenderNormalizer {
    exact: HashMap<String, GenderCategory>,
    folded: HashMap<String, GenderCategory>,
}

impl GenderNormalizer {
    pub fn new(mappings: &[GenderMapping]) -> Self {
        let mut exact = HashMap::new();
        let mut folded = HashMap::new();
        for m in mappings {
            let key = m.from.trim().to_string();
            folded.insert(key.to_lowercase(), m.to);
            exact.insert(key, m.to);
        }
        Self { exact, folded }
    }

    /// Canonical category for one raw cell. Exact matches take priority
    /// over case-insensitive ones.
    pub fn categorize(&self, cell: &Cell) -> GenderCategory {
        let Some(raw) = cell.as_text() else {
            return GenderCategory::Missing;
        };
        let raw = raw.trim();
        self.exact
            .get(raw)
            .or_else(|| self.folded.get(&raw.to_lowercase()))
            .copied()
            .unwrap_or(GenderCategory::Missing)
    }

    /// Categories for every row of a column.
    pub fn categorize_column(&self, column: &Column) -> Vec<GenderCategory> {
        column.cells.iter().map(|c| self.categorize(c)).collect()
    }

    /// New dataset whose gender column holds canonical labels. Returns
    /// `None` when the column does not exist.
    pub fn apply(&self, dataset: &Dataset, gender_col: &str) -> Option<Dataset> {
        let column = dataset.column(gender_col)?;
        let categories = self.categorize_column(column);

        let unmapped = categories
            .iter()
            .zip(&column.cells)
            .filter(|(cat, cell)| **cat == GenderCategory::Missing && !cell.is_missing())
            .count();
        if unmapped > 0 {
            debug!(
                "{} non-empty value(s) in '{}' had no mapping and were set to missing",
                unmapped, gender_col
            );
        }

        let mut normalized = dataset.clone();
        if let Some(target) = normalized.column_mut(gender_col) {
            target.cells = categories
                .into_iter()
                .map(|c| Cell::Text(c.as_str().to_string()))
                .collect();
        }
        Some(normalized)
    }
}

/// Mapping used when none is configured: common spellings of each category.
pub fn default_mappings() -> Vec<GenderMapping> {
    let pairs: [(&str, GenderCategory); 14] = [
        ("female", GenderCategory::Female),
        ("f", GenderCategory::Female),
        ("woman", GenderCategory::Female),
        ("women", GenderCategory::Female),
        ("male", GenderCategory::Male),
        ("m", GenderCategory::Male),
        ("man", GenderCategory::Male),
        ("men", GenderCategory::Male),
        ("other", GenderCategory::Other),
        ("non-binary", GenderCategory::Other),
        ("nonbinary", GenderCategory::Other),
        ("non binary", GenderCategory::Other),
        ("missing", GenderCategory::Missing),
        ("prefer not to say", GenderCategory::Missing),
    ];
    pairs
        .iter()
        .map(|(from, to)| GenderMapping::new(from, *to))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::sample_dataset;

    fn mapping() -> Vec<GenderMapping> {
        vec![
            GenderMapping::new("M", GenderCategory::Male),
            GenderMapping::new("F", GenderCategory::Female),
            GenderMapping::new("Other", GenderCategory::Other),
        ]
    }

    #[test]
    fn test_mapped_values() {
        let normalizer = GenderNormalizer::new(&mapping());
        assert_eq!(
            normalizer.categorize(&Cell::Text("M".into())),
            GenderCategory::Male
        );
        assert_eq!(
            normalizer.categorize(&Cell::Text("f".into())),
            GenderCategory::Female
        );
        assert_eq!(
            normalizer.categorize(&Cell::Text("Other".into())),
            GenderCategory::Other
        );
    }

    #[test]
    fn test_unmapped_values_become_missing() {
        let normalizer = GenderNormalizer::new(&mapping());
        for raw in ["x", "unknown", "", "1"] {
            assert_eq!(
                normalizer.categorize(&Cell::parse(raw)),
                GenderCategory::Missing,
                "value {:?}",
                raw
            );
        }
        assert_eq!(normalizer.categorize(&Cell::Missing), GenderCategory::Missing);
        assert_eq!(
            normalizer.categorize(&Cell::Number(2.0)),
            GenderCategory::Missing
        );
    }

    #[test]
    fn test_numeric_codes() {
        let normalizer = GenderNormalizer::new(&[
            GenderMapping::new("1", GenderCategory::Male),
            GenderMapping::new("2", GenderCategory::Female),
        ]);
        assert_eq!(
            normalizer.categorize(&Cell::Number(1.0)),
            GenderCategory::Male
        );
        assert_eq!(
            normalizer.categorize(&Cell::Number(2.0)),
            GenderCategory::Female
        );
    }

    #[test]
    fn test_apply_returns_new_dataset() {
        let ds = sample_dataset();
        let normalizer = GenderNormalizer::new(&mapping());
        let normalized = normalizer.apply(&ds, "gender").unwrap();

        let labels: Vec<String> = normalized
            .column("gender")
            .unwrap()
            .cells
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(labels, vec!["female", "male", "male", "missing"]);
        // Source dataset is untouched
        assert_eq!(ds.column("gender").unwrap().cells[0], Cell::Text("F".into()));
        assert!(normalizer.apply(&ds, "sex").is_none());
    }

    #[test]
    fn test_later_mapping_wins() {
        let normalizer = GenderNormalizer::new(&[
            GenderMapping::new("x", GenderCategory::Male),
            GenderMapping::new("x", GenderCategory::Other),
        ]);
        assert_eq!(
            normalizer.categorize(&Cell::Text("x".into())),
            GenderCategory::Other
        );
    }
}
