//! Benjamini–Hochberg false discovery rate control.

use crate::models::{CategoricalResult, ContinuousResult, FdrSummary, MultipleTesting, TestResult};

/// Method label written into adjusted results.
pub const BH_METHOD: &str = "BH";

/// Significance level used for raw and adjusted counts.
pub const ALPHA: f64 = 0.05;

/// Benjamini–Hochberg adjusted p-values. Entries without a p-value are
/// excluded from the ranking and stay `None` in the output.
pub fn benjamini_hochberg(p_values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut valid: Vec<(usize, f64)> = p_values
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.filter(|v| v.is_finite()).map(|v| (i, v)))
        .collect();
    let mut out = vec![None; p_values.len()];
    if valid.is_empty() {
        return out;
    }

    valid.sort_by(|a, b| a.1.total_cmp(&b.1));
    let m = valid.len() as f64;
    let mut running_min = f64::INFINITY;
    for rank in (0..valid.len()).rev() {
        let (idx, p) = valid[rank];
        let adjusted = p * m / (rank + 1) as f64;
        running_min = running_min.min(adjusted);
        out[idx] = Some(running_min.min(1.0));
    }
    out
}

fn adjust_family<'a, I>(tests: I) -> usize
where
    I: Iterator<Item = &'a mut TestResult>,
{
    let mut tests: Vec<&mut TestResult> = tests.collect();
    let raw: Vec<Option<f64>> = tests.iter().map(|t| t.p_value()).collect();
    let adjusted = benjamini_hochberg(&raw);
    let mut corrected = 0;
    for (test, p_fdr) in tests.iter_mut().zip(adjusted) {
        if let Some(p_fdr) = p_fdr {
            test.p_fdr = Some(p_fdr);
            test.fdr_method = Some(BH_METHOD.to_string());
            corrected += 1;
        }
    }
    corrected
}

fn count_significant<'a>(tests: impl Iterator<Item = &'a TestResult>) -> (usize, usize) {
    tests.fold((0, 0), |(raw, fdr), t| {
        (
            raw + usize::from(matches!(t.p_value(), Some(p) if p < ALPHA)),
            fdr + usize::from(matches!(t.p_fdr, Some(p) if p < ALPHA)),
        )
    })
}

/// Adjust continuous and categorical p-values as two separate families
/// and report how many tests each family contained.
pub fn apply_fdr(
    continuous: &mut [ContinuousResult],
    categorical: &mut [CategoricalResult],
) -> MultipleTesting {
    let continuous_tests_corrected = adjust_family(continuous.iter_mut().map(|r| &mut r.test));
    let categorical_tests_corrected = adjust_family(categorical.iter_mut().map(|r| &mut r.test));

    let (continuous_sig_raw, continuous_sig_fdr) =
        count_significant(continuous.iter().map(|r| &r.test));
    let (categorical_sig_raw, categorical_sig_fdr) =
        count_significant(categorical.iter().map(|r| &r.test));

    MultipleTesting {
        fdr_method: BH_METHOD.to_string(),
        adjusted: true,
        continuous_tests_corrected,
        categorical_tests_corrected,
        summary: Some(FdrSummary {
            continuous_sig_raw,
            continuous_sig_fdr,
            categorical_sig_raw,
            categorical_sig_fdr,
        }),
    }
}
