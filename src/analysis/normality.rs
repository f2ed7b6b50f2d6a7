//! Per-group normality checks feeding test selection.

use super::groups::GroupSample;
use crate::models::{NormalityKind, NormalityTest};
use crate::stats::normality::{dagostino_pearson, shapiro_wilk, SHAPIRO_MAX_N};
use crate::stats::round_to;
use tracing::debug;

/// Groups smaller than this are not tested.
pub const MIN_NORMALITY_N: usize = 3;

/// Test every group of `var` with at least three values. Shapiro–Wilk is
/// used up to 5000 values, D'Agostino–Pearson above. A failing test is
/// reported with no statistic or p-value and a note.
pub fn assess_normality(var: &str, samples: &[GroupSample]) -> Vec<NormalityTest> {
    samples
        .iter()
        .filter(|s| s.n() >= MIN_NORMALITY_N)
        .map(|s| {
            let (test, outcome) = if s.n() <= SHAPIRO_MAX_N {
                (NormalityKind::ShapiroWilk, shapiro_wilk(&s.values))
            } else {
                (NormalityKind::DAgostinoPearson, dagostino_pearson(&s.values))
            };
            match outcome {
                Ok(o) => NormalityTest {
                    var: var.to_string(),
                    gender: s.gender,
                    test,
                    statistic: Some(round_to(o.statistic, 4)),
                    p: Some(round_to(o.p, 4)),
                    note: None,
                },
                Err(e) => {
                    debug!("{} test failed for {} / {}: {}", test, var, s.gender, e);
                    NormalityTest {
                        var: var.to_string(),
                        gender: s.gender,
                        test,
                        statistic: None,
                        p: None,
                        note: Some(e.to_string()),
                    }
                }
            }
        })
        .collect()
}

/// Whether any group of `var` rejected normality.
pub fn any_rejects(var: &str, tests: &[NormalityTest]) -> bool {
    tests
        .iter()
        .filter(|t| t.var == var)
        .any(NormalityTest::rejects_normality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenderCategory;

    fn sample(gender: GenderCategory, values: Vec<f64>) -> GroupSample {
        GroupSample {
            gender,
            values,
            weights: None,
        }
    }

    #[test]
    fn test_small_groups_are_skipped() {
        let samples = vec![
            sample(GenderCategory::Female, vec![1.0, 2.0]),
            sample(GenderCategory::Male, vec![1.0, 2.0, 4.0, 8.0]),
        ];
        let tests = assess_normality("x", &samples);
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].gender, GenderCategory::Male);
        assert_eq!(tests[0].test, NormalityKind::ShapiroWilk);
        assert!(tests[0].p.is_some());
    }

    #[test]
    fn test_constant_group_is_reported_without_result() {
        let samples = vec![sample(GenderCategory::Female, vec![5.0; 10])];
        let tests = assess_normality("x", &samples);
        assert_eq!(tests[0].p, None);
        assert_eq!(tests[0].statistic, None);
        assert!(tests[0].note.is_some());
        assert!(!any_rejects("x", &tests));
    }

    #[test]
    fn test_large_groups_use_dagostino() {
        let values: Vec<f64> = (0..5001).map(|i| ((i * 7919) % 5001) as f64).collect();
        let tests = assess_normality("x", &[sample(GenderCategory::Female, values)]);
        assert_eq!(tests[0].test, NormalityKind::DAgostinoPearson);
    }

    #[test]
    fn test_any_rejects_filters_by_variable() {
        let skewed = vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 50.0];
        let tests = assess_normality("y", &[sample(GenderCategory::Male, skewed)]);
        assert!(any_rejects("y", &tests));
        assert!(!any_rejects("x", &tests));
    }
}
