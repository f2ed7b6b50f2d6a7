//! Row-to-gender indexing.
//!
//! After normalization the gender column holds canonical labels. This
//! module splits variable columns by those labels in request order.

use crate::dataset::{Cell, Column, Dataset};
use crate::models::GenderCategory;
use crate::stats::ContingencyTable;

/// The values of one continuous variable within one gender group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSample {
    pub gender: GenderCategory,
    pub values: Vec<f64>,
    /// Weights aligned with `values`, present only when every row with a
    /// value also has a numeric weight.
    pub weights: Option<Vec<f64>>,
}

impl GroupSample {
    pub fn n(&self) -> usize {
        self.values.len()
    }
}

/// Canonical category of every row.
#[derive(Debug, Clone)]
pub struct GenderGroups {
    categories: Vec<GenderCategory>,
}

impl GenderGroups {
    /// Index a normalized dataset. Returns `None` if the gender column is
    /// absent.
    pub fn new(dataset: &Dataset, gender_col: &str) -> Option<Self> {
        let column = dataset.column(gender_col)?;
        let categories = column
            .cells
            .iter()
            .map(|c| {
                c.as_text()
                    .and_then(|s| GenderCategory::parse(&s))
                    .unwrap_or(GenderCategory::Missing)
            })
            .collect();
        Some(Self { categories })
    }

    pub fn n_rows(&self) -> usize {
        self.categories.len()
    }

    pub fn count(&self, gender: GenderCategory) -> usize {
        self.categories.iter().filter(|&&c| c == gender).count()
    }

    /// Categories from `order` that have at least one row.
    pub fn present(&self, order: &[GenderCategory]) -> Vec<GenderCategory> {
        order
            .iter()
            .copied()
            .filter(|&g| self.count(g) > 0)
            .collect()
    }

    /// Row indices belonging to `gender`.
    pub fn rows(&self, gender: GenderCategory) -> impl Iterator<Item = usize> + '_ {
        self.categories
            .iter()
            .enumerate()
            .filter(move |(_, c)| **c == gender)
            .map(|(i, _)| i)
    }

    /// Non-missing numeric values of `column` per gender, in `order`.
    /// Groups without any value are omitted.
    pub fn continuous_samples(
        &self,
        column: &Column,
        order: &[GenderCategory],
        weights: Option<&Column>,
    ) -> Vec<GroupSample> {
        order
            .iter()
            .filter_map(|&gender| {
                let mut values = Vec::new();
                let mut w = Vec::new();
                let mut weights_complete = weights.is_some();
                for row in self.rows(gender) {
                    if let Some(v) = column.cells[row].as_f64() {
                        values.push(v);
                        match weights.and_then(|wc| wc.cells[row].as_f64()) {
                            Some(weight) => w.push(weight),
                            None => weights_complete = false,
                        }
                    }
                }
                if values.is_empty() {
                    return None;
                }
                Some(GroupSample {
                    gender,
                    values,
                    weights: weights_complete.then_some(w),
                })
            })
            .collect()
    }

    /// Present values of `column` per gender, in `order`. Genders without
    /// any value are omitted.
    pub fn level_samples(
        &self,
        column: &Column,
        order: &[GenderCategory],
    ) -> Vec<(GenderCategory, Vec<String>)> {
        order
            .iter()
            .filter_map(|&gender| {
                let levels: Vec<String> = self
                    .rows(gender)
                    .filter_map(|row| column.cells[row].as_text())
                    .collect();
                (!levels.is_empty()).then_some((gender, levels))
            })
            .collect()
    }

    /// Level × gender contingency table. Rows are the observed levels in
    /// sorted order; columns are the genders from `order` with data.
    pub fn contingency(&self, column: &Column, order: &[GenderCategory]) -> ContingencyTable {
        let samples = self.level_samples(column, order);
        let levels: Vec<String> = observed_levels(column)
            .into_iter()
            .filter(|level| samples.iter().any(|(_, values)| values.contains(level)))
            .collect();
        let col_labels: Vec<String> = samples.iter().map(|(g, _)| g.to_string()).collect();
        let pairs: Vec<(String, String)> = samples
            .iter()
            .flat_map(|(g, values)| values.iter().map(move |v| (v.clone(), g.to_string())))
            .collect();
        ContingencyTable::from_pairs(
            levels,
            col_labels,
            pairs.iter().map(|(l, g)| (l.as_str(), g.as_str())),
        )
    }
}

/// Distinct present values of a column, sorted.
pub fn observed_levels(column: &Column) -> Vec<String> {
    let mut distinct: Vec<&Cell> = Vec::new();
    for cell in column.cells.iter().filter(|c| !c.is_missing()) {
        if !distinct.contains(&cell) {
            distinct.push(cell);
        }
    }
    distinct.sort_by(|a, b| a.total_cmp(b));
    distinct.iter().map(|c| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::loader::parse_csv;

    fn grouped() -> (Dataset, GenderGroups) {
        let ds = parse_csv(
            "t.csv",
            "gender,score,weight,smoker\n\
             female,1,2,yes\n\
             male,2,1,no\n\
             female,3,,no\n\
             male,,1,yes\n\
             missing,5,1,\n\
             male,6,1,yes\n",
        )
        .unwrap();
        let groups = GenderGroups::new(&ds, "gender").unwrap();
        (ds, groups)
    }

    #[test]
    fn test_present_in_order() {
        let (_, groups) = grouped();
        assert_eq!(groups.n_rows(), 6);
        assert_eq!(
            groups.present(&[GenderCategory::Other, GenderCategory::Male, GenderCategory::Female]),
            vec![GenderCategory::Male, GenderCategory::Female]
        );
        assert_eq!(groups.count(GenderCategory::Missing), 1);
    }

    #[test]
    fn test_continuous_samples() {
        let (ds, groups) = grouped();
        let samples = groups.continuous_samples(
            ds.column("score").unwrap(),
            &GenderCategory::ALL,
            ds.column("weight"),
        );
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].gender, GenderCategory::Female);
        assert_eq!(samples[0].values, vec![1.0, 3.0]);
        // Second female row has no weight
        assert_eq!(samples[0].weights, None);
        assert_eq!(samples[1].values, vec![2.0, 6.0]);
        assert_eq!(samples[1].weights, Some(vec![1.0, 1.0]));
        assert_eq!(samples[2].gender, GenderCategory::Missing);
    }

    #[test]
    fn test_contingency() {
        let (ds, groups) = grouped();
        let table = groups.contingency(ds.column("smoker").unwrap(), &GenderCategory::ALL);
        assert_eq!(table.row_labels, vec!["no", "yes"]);
        assert_eq!(table.col_labels, vec!["female", "male"]);
        assert_eq!(table.counts().to_vec(), vec![vec![1u64, 1], vec![1, 2]]);
    }
}
