//! Descriptive statistics per gender group.
//!
//! Suppression happens here and only here: rows whose n falls below the
//! threshold have every field replaced by the `<threshold` marker. Tests
//! and effect sizes are computed from the unsuppressed samples.

use super::groups::{observed_levels, GenderGroups, GroupSample};
use crate::dataset::{Column, Dataset};
use crate::models::{
    GenderCategory, GenderSummary, GroupStatistics, LevelStatistics, MissingnessInfo, Reported,
};
use crate::stats::{self, round_to};

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn rounded(v: f64) -> Reported<f64> {
    Reported::from_f64(round_to(v, 3))
}

/// Sample composition per present category. `missing_pct` is the share
/// of the group's rows with a missing value in any of `variables`.
pub fn summarize_by_gender(
    dataset: &Dataset,
    groups: &GenderGroups,
    order: &[GenderCategory],
    variables: &[String],
) -> Vec<GenderSummary> {
    let total = groups.n_rows();
    let columns: Vec<&Column> = variables.iter().filter_map(|v| dataset.column(v)).collect();

    groups
        .present(order)
        .into_iter()
        .map(|gender| {
            let n = groups.count(gender);
            let incomplete = groups
                .rows(gender)
                .filter(|&row| columns.iter().any(|c| c.cells[row].is_missing()))
                .count();
            GenderSummary {
                gender,
                n,
                pct: round_to(percentage(n, total), 2),
                missing_pct: round_to(percentage(incomplete, n), 2),
            }
        })
        .collect()
}

/// Weighted mean and (biased) weighted standard deviation.
fn weighted_mean_sd(values: &[f64], weights: &[f64]) -> Option<(f64, f64)> {
    let w_sum: f64 = weights.iter().sum();
    if w_sum <= 0.0 {
        return None;
    }
    let mean = values.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / w_sum;
    let var = values
        .iter()
        .zip(weights)
        .map(|(v, w)| w * (v - mean).powi(2))
        .sum::<f64>()
        / w_sum;
    Some((mean, var.sqrt()))
}

/// Statistics row for one group.
pub fn group_statistics(sample: &GroupSample, threshold: usize) -> GroupStatistics {
    let n = sample.n();
    if n < threshold {
        return GroupStatistics::suppressed(sample.gender, threshold);
    }

    let weighted = sample
        .weights
        .as_ref()
        .and_then(|w| weighted_mean_sd(&sample.values, w));
    let (mean, sd) = match weighted {
        Some((m, s)) => (Reported::from_f64(round_to(m, 3)), rounded(s)),
        None => (
            stats::mean(&sample.values).map_or_else(Reported::not_available, rounded),
            stats::sample_sd(&sample.values).map_or_else(Reported::not_available, rounded),
        ),
    };

    let sorted = stats::sorted(&sample.values);
    GroupStatistics {
        gender: sample.gender,
        n: Reported::Value(n),
        mean,
        sd,
        median: rounded(stats::quantile(&sorted, 0.5)),
        iqr: rounded(stats::quantile(&sorted, 0.75) - stats::quantile(&sorted, 0.25)),
        min: rounded(sorted[0]),
        max: rounded(sorted[n - 1]),
    }
}

/// Statistics rows for a continuous variable, one per group with data.
pub fn summarize_continuous(samples: &[GroupSample], threshold: usize) -> Vec<GroupStatistics> {
    samples
        .iter()
        .filter(|s| s.n() > 0)
        .map(|s| group_statistics(s, threshold))
        .collect()
}

/// Level rows for a categorical variable: every observed level crossed
/// with every gender that has data. Percentages are of the gender's total
/// row count, so rows missing this variable lower every level's share.
pub fn summarize_categorical(
    column: &Column,
    groups: &GenderGroups,
    order: &[GenderCategory],
    threshold: usize,
) -> Vec<LevelStatistics> {
    let samples = groups.level_samples(column, order);
    let levels = observed_levels(column);
    let mut rows = Vec::new();

    for (gender, values) in &samples {
        let total = groups.count(*gender);
        for level in &levels {
            let n = values.iter().filter(|v| *v == level).count();
            let (n, pct) = if n < threshold {
                (Reported::suppressed(threshold), Reported::suppressed(threshold))
            } else {
                (Reported::Value(n), Reported::Value(round_to(percentage(n, total), 1)))
            };
            rows.push(LevelStatistics {
                level: level.clone(),
                gender: *gender,
                n,
                pct,
            });
        }
    }
    rows
}

/// Missing counts for each existing variable within each present gender.
pub fn analyze_missingness(
    dataset: &Dataset,
    groups: &GenderGroups,
    order: &[GenderCategory],
    variables: &[String],
) -> Vec<MissingnessInfo> {
    let present = groups.present(order);
    variables
        .iter()
        .filter_map(|var| dataset.column(var).map(|c| (var, c)))
        .flat_map(|(var, column)| {
            present.iter().map(move |&gender| {
                let n = groups.count(gender);
                let missing_n = groups
                    .rows(gender)
                    .filter(|&row| column.cells[row].is_missing())
                    .count();
                MissingnessInfo {
                    var: var.clone(),
                    gender,
                    missing_n,
                    missing_pct: round_to(percentage(missing_n, n), 2),
                }
            })
        })
        .collect()
}
