//! Effect sizes and their qualitative bands.

use super::contingency::cross_ratio;
use super::hypothesis::chi_square_independence;
use super::{mean, round_to, sample_variance, ContingencyTable};
use crate::models::{EffectKind, EffectSize};

/// Standardized mean difference with pooled sample SD. `None` when a
/// group has fewer than two values or the pooled SD is zero.
pub fn cohens_d(a: &[f64], b: &[f64]) -> Option<f64> {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return None;
    }
    let (v1, v2) = (sample_variance(a)?, sample_variance(b)?);
    let pooled = (((n1 - 1) as f64 * v1 + (n2 - 1) as f64 * v2) / (n1 + n2 - 2) as f64).sqrt();
    if pooled == 0.0 {
        return None;
    }
    Some((mean(a)? - mean(b)?) / pooled)
}

/// Small-sample corrected Cohen's d.
pub fn hedges_g(d: f64, n1: usize, n2: usize) -> f64 {
    d * (1.0 - 3.0 / (4.0 * (n1 + n2) as f64 - 9.0))
}

struct Partition {
    ss_between: f64,
    ss_within: f64,
    n: usize,
    k: usize,
}

fn partition(groups: &[&[f64]]) -> Option<Partition> {
    let all: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let grand = mean(&all)?;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for g in groups {
        let m = mean(g)?;
        ss_between += g.len() as f64 * (m - grand).powi(2);
        ss_within += g.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    }
    Some(Partition {
        ss_between,
        ss_within,
        n: all.len(),
        k: groups.len(),
    })
}

/// Share of total variance explained by group membership.
pub fn eta_squared(groups: &[&[f64]]) -> Option<f64> {
    let p = partition(groups)?;
    let total = p.ss_between + p.ss_within;
    if total == 0.0 {
        return None;
    }
    Some(p.ss_between / total)
}

/// Bias-corrected eta-squared: `(SSB - (k - 1) MSW) / SST`.
pub fn epsilon_squared(groups: &[&[f64]]) -> Option<f64> {
    let p = partition(groups)?;
    let total = p.ss_between + p.ss_within;
    if total == 0.0 || p.n <= p.k {
        return None;
    }
    let ms_within = p.ss_within / (p.n - p.k) as f64;
    Some((p.ss_between - (p.k - 1) as f64 * ms_within) / total)
}

/// Cramér's V from the table's chi-square statistic.
pub fn cramers_v(table: &ContingencyTable) -> Option<f64> {
    let min_dim = table.n_rows().min(table.n_cols()).saturating_sub(1);
    let n = table.total();
    if min_dim == 0 || n == 0 {
        return None;
    }
    let chi2 = chi_square_independence(table).ok()?.statistic;
    Some((chi2 / (n as f64 * min_dim as f64)).sqrt())
}

/// Odds ratio of a 2x2 table with a 95% log-normal confidence interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OddsRatio {
    pub value: f64,
    pub ci: Option<(f64, f64)>,
}

/// `(a d) / (b c)`. `None` when an off-diagonal cell is zero; the
/// interval is omitted when a diagonal cell is zero.
pub fn odds_ratio(table: &ContingencyTable) -> Option<OddsRatio> {
    let (a, b, c, d) = table.cells_2x2().ok()?;
    if b == 0 || c == 0 {
        return None;
    }
    let value = cross_ratio(a, b, c, d);
    let ci = if a > 0 && d > 0 {
        let se = (1.0 / a as f64 + 1.0 / b as f64 + 1.0 / c as f64 + 1.0 / d as f64).sqrt();
        let log_or = value.ln();
        Some(((log_or - 1.96 * se).exp(), (log_or + 1.96 * se).exp()))
    } else {
        None
    };
    Some(OddsRatio { value, ci })
}

pub fn interpret_cohens_d(d: f64) -> &'static str {
    match d.abs() {
        x if x < 0.2 => "negligible",
        x if x < 0.5 => "small",
        x if x < 0.8 => "medium",
        _ => "large",
    }
}

pub fn interpret_eta_squared(eta2: f64) -> &'static str {
    match eta2 {
        x if x < 0.01 => "negligible",
        x if x < 0.06 => "small",
        x if x < 0.14 => "medium",
        _ => "large",
    }
}

pub fn interpret_cramers_v(v: f64) -> &'static str {
    match v {
        x if x < 0.1 => "negligible",
        x if x < 0.3 => "small",
        x if x < 0.5 => "medium",
        _ => "large",
    }
}

pub fn interpret_odds_ratio(or: f64) -> &'static str {
    match or {
        x if x < 0.5 => "strong negative association",
        x if x < 0.8 => "moderate negative association",
        x if x < 1.2 => "negligible association",
        x if x < 2.0 => "moderate positive association",
        _ => "strong positive association",
    }
}

fn effect(name: EffectKind, value: f64, interpretation: &str) -> EffectSize {
    EffectSize {
        name,
        value: round_to(value, 3),
        ci_lower: None,
        ci_upper: None,
        interpretation: interpretation.to_string(),
    }
}

/// Effect sizes for a continuous variable: Cohen's d and Hedges' g for
/// two groups, eta- and epsilon-squared for three or more. Empty groups
/// are ignored.
pub fn continuous_effects(groups: &[&[f64]]) -> Vec<EffectSize> {
    let groups: Vec<&[f64]> = groups.iter().copied().filter(|g| !g.is_empty()).collect();
    let mut effects = Vec::new();
    match groups.len() {
        0 | 1 => {}
        2 => {
            if let Some(d) = cohens_d(groups[0], groups[1]) {
                effects.push(effect(EffectKind::CohensD, d, interpret_cohens_d(d)));
                let g = hedges_g(d, groups[0].len(), groups[1].len());
                effects.push(effect(EffectKind::HedgesG, g, interpret_cohens_d(g)));
            }
        }
        _ => {
            if let Some(eta2) = eta_squared(&groups) {
                effects.push(effect(EffectKind::EtaSquared, eta2, interpret_eta_squared(eta2)));
            }
            if let Some(eps2) = epsilon_squared(&groups) {
                effects.push(effect(
                    EffectKind::EpsilonSquared,
                    eps2,
                    interpret_eta_squared(eps2),
                ));
            }
        }
    }
    effects
}

/// Effect sizes for a categorical variable: Cramér's V, plus the odds
/// ratio for 2x2 tables.
pub fn categorical_effects(table: &ContingencyTable) -> Vec<EffectSize> {
    let mut effects = Vec::new();
    if table.n_rows() < 2 || table.n_cols() < 2 {
        return effects;
    }
    if let Some(v) = cramers_v(table) {
        effects.push(effect(EffectKind::CramersV, v, interpret_cramers_v(v)));
    }
    if table.is_two_by_two() {
        if let Some(or) = odds_ratio(table) {
            let mut e = effect(EffectKind::OddsRatio, or.value, interpret_odds_ratio(or.value));
            if let Some((lo, hi)) = or.ci {
                e.ci_lower = Some(round_to(lo, 3));
                e.ci_upper = Some(round_to(hi, 3));
            }
            effects.push(e);
        }
    }
    effects
}
