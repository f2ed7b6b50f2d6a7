//! Hypothesis test selection.
//!
//! Selection is a pure function of group count, the normality gate and
//! contingency-table sparsity. Each combination maps to one plan variant
//! and each plan runs exactly one test.

use super::groups::GroupSample;
use crate::models::{DegreesOfFreedom, Reported, TestKind, TestResult};
use crate::stats::hypothesis::{
    chi_square_independence, fisher_exact, kruskal_wallis, mann_whitney_u, welch_anova,
    welch_t_test,
};
use crate::stats::{round_to, ContingencyTable, StatResult, TestOutcome};

/// Smallest expected cell count for which chi-square is trusted.
pub const MIN_EXPECTED_COUNT: f64 = 5.0;

/// Test plan for a continuous variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuousPlan {
    /// Fewer than two groups have data.
    Insufficient,
    TwoGroupNormal,
    TwoGroupNonNormal,
    MultiGroupNormal,
    MultiGroupNonNormal,
}

impl ContinuousPlan {
    pub fn choose(groups_with_data: usize, normal: bool) -> Self {
        match (groups_with_data, normal) {
            (0 | 1, _) => ContinuousPlan::Insufficient,
            (2, true) => ContinuousPlan::TwoGroupNormal,
            (2, false) => ContinuousPlan::TwoGroupNonNormal,
            (_, true) => ContinuousPlan::MultiGroupNormal,
            (_, false) => ContinuousPlan::MultiGroupNonNormal,
        }
    }

    pub fn test_kind(&self) -> TestKind {
        match self {
            ContinuousPlan::Insufficient => TestKind::InsufficientData,
            ContinuousPlan::TwoGroupNormal => TestKind::WelchTTest,
            ContinuousPlan::TwoGroupNonNormal => TestKind::MannWhitney,
            ContinuousPlan::MultiGroupNormal => TestKind::WelchAnova,
            ContinuousPlan::MultiGroupNonNormal => TestKind::KruskalWallis,
        }
    }
}

/// Test plan for a categorical variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoricalPlan {
    /// Fewer than two levels or two genders in the table.
    Insufficient,
    /// 2x2 table with an expected count below five.
    SparseTwoByTwo,
    /// Larger table with an expected count below five.
    SparseLarger,
    Dense,
}

impl CategoricalPlan {
    pub fn choose(table: &ContingencyTable) -> Self {
        if table.n_rows() < 2 || table.n_cols() < 2 {
            return CategoricalPlan::Insufficient;
        }
        let sparse = table
            .min_expected()
            .map_or(true, |m| m < MIN_EXPECTED_COUNT);
        match (sparse, table.is_two_by_two()) {
            (true, true) => CategoricalPlan::SparseTwoByTwo,
            (true, false) => CategoricalPlan::SparseLarger,
            (false, _) => CategoricalPlan::Dense,
        }
    }

    pub fn test_kind(&self) -> TestKind {
        match self {
            CategoricalPlan::Insufficient => TestKind::InsufficientData,
            CategoricalPlan::SparseTwoByTwo => TestKind::FisherExact,
            CategoricalPlan::SparseLarger | CategoricalPlan::Dense => TestKind::ChiSquare,
        }
    }
}

/// Convert a test outcome (or its failure) into a reported result.
fn to_result(
    kind: TestKind,
    outcome: StatResult<TestOutcome>,
    assumptions_met: bool,
    note: &str,
) -> TestResult {
    match outcome {
        Ok(o) => TestResult {
            name: kind,
            p: Reported::from_f64(round_to(o.p, 4)),
            statistic: Reported::from_f64(round_to(o.statistic, 4)),
            df: o.df.map(|df| match df {
                DegreesOfFreedom::Single(d) => DegreesOfFreedom::Single(round_to(d, 4)),
                DegreesOfFreedom::Pair(a, b) => DegreesOfFreedom::Pair(round_to(a, 4), round_to(b, 4)),
            }),
            assumptions_met,
            note: Some(note.to_string()),
            p_fdr: None,
            fdr_method: None,
        },
        Err(e) => TestResult::failed(kind, format!("Error in {}: {}", kind, e)),
    }
}

/// Select and run the test for a continuous variable. `normal` is false
/// when any group's normality test rejected normality.
pub fn run_continuous(samples: &[GroupSample], normal: bool) -> TestResult {
    let groups: Vec<&[f64]> = samples
        .iter()
        .filter(|s| s.n() > 0)
        .map(|s| s.values.as_slice())
        .collect();

    let plan = ContinuousPlan::choose(groups.len(), normal);
    let kind = plan.test_kind();
    match plan {
        ContinuousPlan::Insufficient => TestResult::insufficient("Less than 2 groups with data"),
        ContinuousPlan::TwoGroupNormal => to_result(
            kind,
            welch_t_test(groups[0], groups[1]),
            true,
            "Welch's t-test (unequal variances assumed)",
        ),
        ContinuousPlan::TwoGroupNonNormal => to_result(
            kind,
            mann_whitney_u(groups[0], groups[1]),
            true,
            "Mann-Whitney U test (non-parametric)",
        ),
        ContinuousPlan::MultiGroupNormal => to_result(
            kind,
            welch_anova(&groups),
            true,
            "Welch's ANOVA (unequal variances assumed)",
        ),
        ContinuousPlan::MultiGroupNonNormal => to_result(
            kind,
            kruskal_wallis(&groups),
            true,
            "Kruskal-Wallis test (non-parametric)",
        ),
    }
}

/// Select and run the test for a level × gender table.
pub fn run_categorical(table: &ContingencyTable) -> TestResult {
    let plan = CategoricalPlan::choose(table);
    let kind = plan.test_kind();
    match plan {
        CategoricalPlan::Insufficient => {
            TestResult::insufficient("Insufficient data for contingency table")
        }
        CategoricalPlan::SparseTwoByTwo => to_result(
            kind,
            fisher_exact(table),
            true,
            "Fisher's exact test (2x2 table)",
        ),
        CategoricalPlan::SparseLarger => to_result(
            kind,
            chi_square_independence(table),
            false,
            "Chi-square test of independence (some expected frequencies < 5, interpret with caution)",
        ),
        CategoricalPlan::Dense => to_result(
            kind,
            chi_square_independence(table),
            true,
            "Chi-square test of independence",
        ),
    }
}
