//! Hypothesis tests.
//!
//! All tests are two-sided. Results follow the conventions of the common
//! scientific Python stack so reports can be cross-checked against it.

use super::contingency::cross_ratio;
use super::{finite, mean, rank_with_ties, sample_variance, ContingencyTable, StatError, StatResult};
use crate::models::DegreesOfFreedom;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};
use statrs::function::factorial::ln_factorial;

/// Statistic, p-value and degrees of freedom of a completed test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p: f64,
    pub df: Option<DegreesOfFreedom>,
}

fn dist_err(e: impl std::fmt::Display) -> StatError {
    StatError::Distribution(e.to_string())
}

fn require(needed: usize, got: usize) -> StatResult<()> {
    if got < needed {
        Err(StatError::TooFewObservations { needed, got })
    } else {
        Ok(())
    }
}

fn clamp_p(p: f64) -> f64 {
    p.clamp(0.0, 1.0)
}

/// Welch's unequal-variance t-test with Welch–Satterthwaite degrees of
/// freedom.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> StatResult<TestOutcome> {
    require(2, a.len().min(b.len()))?;
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (m1, m2) = (
        mean(a).ok_or(StatError::NonFinite)?,
        mean(b).ok_or(StatError::NonFinite)?,
    );
    let v1 = sample_variance(a).ok_or(StatError::NonFinite)? / n1;
    let v2 = sample_variance(b).ok_or(StatError::NonFinite)? / n2;
    if v1 + v2 == 0.0 {
        return Err(StatError::ZeroVariance);
    }

    let t = finite((m1 - m2) / (v1 + v2).sqrt())?;
    let df = finite((v1 + v2).powi(2) / (v1.powi(2) / (n1 - 1.0) + v2.powi(2) / (n2 - 1.0)))?;
    let dist = StudentsT::new(0.0, 1.0, df).map_err(dist_err)?;
    Ok(TestOutcome {
        statistic: t,
        p: clamp_p(2.0 * dist.sf(t.abs())),
        df: Some(DegreesOfFreedom::Single(df)),
    })
}

/// Mann–Whitney U test. The statistic is U for the first sample.
///
/// The exact null distribution is used when either sample has at most
/// eight observations and there are no ties; otherwise the normal
/// approximation with tie and continuity correction.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> StatResult<TestOutcome> {
    require(1, a.len().min(b.len()))?;
    let (n1, n2) = (a.len(), b.len());
    let pooled: Vec<f64> = a.iter().chain(b).copied().collect();
    let (ranks, tie_term) = rank_with_ties(&pooled);

    let r1: f64 = ranks[..n1].iter().sum();
    let u1 = r1 - (n1 * (n1 + 1)) as f64 / 2.0;
    let u2 = (n1 * n2) as f64 - u1;
    let u = u1.max(u2);

    let p = if (n1 <= 8 || n2 <= 8) && tie_term == 0.0 {
        2.0 * exact_u_sf(n1, n2, u.round() as usize)
    } else {
        let n = (n1 + n2) as f64;
        let mu = (n1 * n2) as f64 / 2.0;
        let var = (n1 * n2) as f64 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
        if var <= 0.0 {
            return Err(StatError::IdenticalValues);
        }
        let z = (u - mu - 0.5) / var.sqrt();
        let normal = Normal::new(0.0, 1.0).map_err(dist_err)?;
        2.0 * normal.sf(z)
    };

    Ok(TestOutcome {
        statistic: u1,
        p: clamp_p(finite(p)?),
        df: None,
    })
}

/// P(U >= u) under the null for sample sizes `m` and `n`, from the
/// coefficients of the Gaussian binomial polynomial.
fn exact_u_sf(m: usize, n: usize, u: usize) -> f64 {
    let (m, n) = (m.min(n), m.max(n));
    let len = m * n + 1;
    let mut coef = vec![0.0f64; len];
    coef[0] = 1.0;
    for i in 1..=m {
        // multiply by (1 - q^(n+i))
        let shift = n + i;
        for k in (shift..len).rev() {
            coef[k] -= coef[k - shift];
        }
        // divide by (1 - q^i)
        for k in i..len {
            coef[k] += coef[k - i];
        }
    }
    let total: f64 = coef.iter().sum();
    let tail: f64 = coef.iter().skip(u).sum();
    tail / total
}

/// Welch's heteroscedastic one-way ANOVA. Degrees of freedom are
/// `(k - 1, 1 / lambda)`.
pub fn welch_anova(groups: &[&[f64]]) -> StatResult<TestOutcome> {
    let k = groups.len();
    require(2, k)?;
    require(2, groups.iter().map(|g| g.len()).min().unwrap_or(0))?;

    let mut ns = Vec::with_capacity(k);
    let mut means = Vec::with_capacity(k);
    let mut weights = Vec::with_capacity(k);
    for g in groups {
        let var = sample_variance(g).ok_or(StatError::NonFinite)?;
        if var == 0.0 {
            return Err(StatError::ZeroVariance);
        }
        let n = g.len() as f64;
        ns.push(n);
        means.push(mean(g).ok_or(StatError::NonFinite)?);
        weights.push(n / var);
    }

    let r = k as f64;
    let w_sum: f64 = weights.iter().sum();
    let adj_grand_mean: f64 = weights.iter().zip(&means).map(|(w, m)| w * m).sum::<f64>() / w_sum;
    let ss_betadj: f64 = weights
        .iter()
        .zip(&means)
        .map(|(w, m)| w * (m - adj_grand_mean).powi(2))
        .sum();
    let ms_betadj = ss_betadj / (r - 1.0);
    let lambda = 3.0
        * weights
            .iter()
            .zip(&ns)
            .map(|(w, n)| (1.0 - w / w_sum).powi(2) / (n - 1.0))
            .sum::<f64>()
        / (r * r - 1.0);

    let f = finite(ms_betadj / (1.0 + 2.0 * lambda * (r - 2.0) / 3.0))?;
    let df1 = r - 1.0;
    let df2 = finite(1.0 / lambda)?;
    let dist = FisherSnedecor::new(df1, df2).map_err(dist_err)?;
    Ok(TestOutcome {
        statistic: f,
        p: clamp_p(dist.sf(f)),
        df: Some(DegreesOfFreedom::Pair(df1, df2)),
    })
}

/// Kruskal–Wallis H test with tie correction.
pub fn kruskal_wallis(groups: &[&[f64]]) -> StatResult<TestOutcome> {
    let k = groups.len();
    require(2, k)?;
    require(1, groups.iter().map(|g| g.len()).min().unwrap_or(0))?;

    let pooled: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let n = pooled.len() as f64;
    let (ranks, tie_term) = rank_with_ties(&pooled);

    let mut offset = 0;
    let mut rank_term = 0.0;
    for g in groups {
        let sum: f64 = ranks[offset..offset + g.len()].iter().sum();
        rank_term += sum * sum / g.len() as f64;
        offset += g.len();
    }

    let correction = 1.0 - tie_term / (n * n * n - n);
    if correction <= 0.0 {
        return Err(StatError::IdenticalValues);
    }
    let h = finite((12.0 / (n * (n + 1.0)) * rank_term - 3.0 * (n + 1.0)) / correction)?;
    let df = (k - 1) as f64;
    let dist = ChiSquared::new(df).map_err(dist_err)?;
    Ok(TestOutcome {
        statistic: h,
        p: clamp_p(dist.sf(h)),
        df: Some(DegreesOfFreedom::Single(df)),
    })
}

/// Pearson chi-square test of independence. Yates' continuity
/// correction is applied when the table has one degree of freedom.
pub fn chi_square_independence(table: &ContingencyTable) -> StatResult<TestOutcome> {
    let expected = table.expected();
    if expected.iter().flatten().any(|&e| e == 0.0) {
        return Err(StatError::ZeroExpected);
    }

    let dof = (table.n_rows().saturating_sub(1) * table.n_cols().saturating_sub(1)) as f64;
    if dof == 0.0 {
        return Ok(TestOutcome {
            statistic: 0.0,
            p: 1.0,
            df: Some(DegreesOfFreedom::Single(0.0)),
        });
    }

    let yates = dof == 1.0;
    let mut chi2 = 0.0;
    for (obs_row, exp_row) in table.counts().iter().zip(&expected) {
        for (&o, &e) in obs_row.iter().zip(exp_row) {
            let mut diff = o as f64 - e;
            if yates {
                diff = diff.signum() * (diff.abs() - 0.5).max(0.0);
            }
            chi2 += diff * diff / e;
        }
    }

    let chi2 = finite(chi2)?;
    let dist = ChiSquared::new(dof).map_err(dist_err)?;
    Ok(TestOutcome {
        statistic: chi2,
        p: clamp_p(dist.sf(chi2)),
        df: Some(DegreesOfFreedom::Single(dof)),
    })
}

/// Fisher's exact test on a 2x2 table. The statistic is the sample odds
/// ratio, which is infinite when an off-diagonal cell is zero.
pub fn fisher_exact(table: &ContingencyTable) -> StatResult<TestOutcome> {
    let (a, b, c, d) = table.cells_2x2()?;

    let odds_ratio = if b > 0 && c > 0 {
        cross_ratio(a, b, c, d)
    } else {
        f64::INFINITY
    };

    let row1 = a + b;
    let row2 = c + d;
    let col1 = a + c;
    let total = row1 + row2;
    if row1 == 0 || row2 == 0 || col1 == 0 || col1 == total {
        return Ok(TestOutcome {
            statistic: f64::NAN,
            p: 1.0,
            df: None,
        });
    }

    let ln_choose = |n: u64, k: u64| ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k);
    let ln_total = ln_choose(total, col1);
    let pmf = |x: u64| (ln_choose(row1, x) + ln_choose(row2, col1 - x) - ln_total).exp();

    let observed = pmf(a);
    let lo = col1.saturating_sub(row2);
    let hi = row1.min(col1);
    let p: f64 = (lo..=hi)
        .map(pmf)
        .filter(|&q| q <= observed * (1.0 + 1e-7))
        .sum();

    Ok(TestOutcome {
        statistic: odds_ratio,
        p: clamp_p(p),
        df: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() < tol,
            "expected {} got {}",
            expected,
            actual
        );
    }

    fn table(rows: Vec<Vec<u64>>) -> ContingencyTable {
        let row_labels = (0..rows.len()).map(|i| format!("r{}", i)).collect();
        let col_labels = (0..rows[0].len()).map(|i| format!("c{}", i)).collect();
        ContingencyTable::new(row_labels, col_labels, rows)
    }

    #[test]
    fn test_welch_t_test() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let out = welch_t_test(&a, &b).unwrap();
        approx(out.statistic, -3.0 / 2.5f64.sqrt(), 1e-10);
        match out.df {
            Some(DegreesOfFreedom::Single(df)) => approx(df, 6.25 / 1.0625, 1e-10),
            other => panic!("unexpected df {:?}", other),
        }
        assert!(out.p > 0.09 && out.p < 0.13, "p = {}", out.p);
    }

    #[test]
    fn test_welch_t_test_zero_variance() {
        let a = [3.0, 3.0, 3.0];
        assert_eq!(welch_t_test(&a, &a), Err(StatError::ZeroVariance));
        assert!(matches!(
            welch_t_test(&[1.0], &a),
            Err(StatError::TooFewObservations { needed: 2, got: 1 })
        ));
    }

    #[test]
    fn test_mann_whitney_exact() {
        let out = mann_whitney_u(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(out.statistic, 0.0);
        approx(out.p, 0.1, 1e-12);
    }

    #[test]
    fn test_mann_whitney_asymptotic() {
        let a: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let b: Vec<f64> = (11..=20).map(|v| v as f64).collect();
        let out = mann_whitney_u(&a, &b).unwrap();
        assert_eq!(out.statistic, 0.0);
        assert!(out.p > 1.7e-4 && out.p < 1.95e-4, "p = {}", out.p);
    }

    #[test]
    fn test_mann_whitney_identical_values() {
        let a = [2.0; 10];
        assert_eq!(mann_whitney_u(&a, &a), Err(StatError::IdenticalValues));
    }

    #[test]
    fn test_exact_u_distribution_sums_to_one() {
        approx(exact_u_sf(4, 6, 0), 1.0, 1e-12);
        // P(U >= 24) for m = 4, n = 6 is 1 / C(10, 4)
        approx(exact_u_sf(4, 6, 24), 1.0 / 210.0, 1e-12);
    }

    #[test]
    fn test_welch_anova() {
        let g1 = [1.0, 2.0, 3.0];
        let g2 = [2.0, 3.0, 4.0];
        let g3 = [3.0, 4.0, 5.0];
        let out = welch_anova(&[&g1, &g2, &g3]).unwrap();
        approx(out.statistic, 18.0 / 7.0, 1e-10);
        match out.df {
            Some(DegreesOfFreedom::Pair(df1, df2)) => {
                approx(df1, 2.0, 1e-12);
                approx(df2, 4.0, 1e-9);
            }
            other => panic!("unexpected df {:?}", other),
        }
        approx(out.p, 49.0 / 256.0, 1e-6);
    }

    #[test]
    fn test_welch_anova_zero_variance() {
        let g1 = [1.0, 1.0];
        let g2 = [2.0, 3.0];
        assert_eq!(welch_anova(&[&g1, &g2]), Err(StatError::ZeroVariance));
    }

    #[test]
    fn test_kruskal_wallis() {
        let g1 = [1.0, 2.0, 3.0];
        let g2 = [4.0, 5.0, 6.0];
        let g3 = [7.0, 8.0, 9.0];
        let out = kruskal_wallis(&[&g1, &g2, &g3]).unwrap();
        approx(out.statistic, 7.2, 1e-10);
        approx(out.p, (-3.6f64).exp(), 1e-8);
    }

    #[test]
    fn test_kruskal_wallis_identical_values() {
        let g = [5.0, 5.0, 5.0];
        assert_eq!(kruskal_wallis(&[&g, &g]), Err(StatError::IdenticalValues));
    }

    #[test]
    fn test_chi_square_with_yates() {
        let out = chi_square_independence(&table(vec![vec![10, 20], vec![30, 40]])).unwrap();
        let expected = 2.25 * (1.0 / 12.0 + 1.0 / 18.0 + 1.0 / 28.0 + 1.0 / 42.0);
        approx(out.statistic, expected, 1e-10);
        assert!(out.p > 0.49 && out.p < 0.52, "p = {}", out.p);
        assert_eq!(out.df, Some(DegreesOfFreedom::Single(1.0)));
    }

    #[test]
    fn test_chi_square_independent_table() {
        let out = chi_square_independence(&table(vec![vec![10, 10], vec![20, 20], vec![30, 30]]))
            .unwrap();
        approx(out.statistic, 0.0, 1e-12);
        approx(out.p, 1.0, 1e-12);
        assert_eq!(out.df, Some(DegreesOfFreedom::Single(2.0)));
    }

    #[test]
    fn test_fisher_exact() {
        let out = fisher_exact(&table(vec![vec![8, 2], vec![1, 5]])).unwrap();
        approx(out.statistic, 20.0, 1e-12);
        approx(out.p, 400.0 / 11440.0, 1e-9);
    }

    #[test]
    fn test_fisher_exact_balanced_table() {
        let out = fisher_exact(&table(vec![vec![7, 7], vec![3, 3]])).unwrap();
        approx(out.statistic, 1.0, 1e-12);
        approx(out.p, 1.0, 1e-9);
    }

    #[test]
    fn test_fisher_exact_rejects_larger_tables() {
        let result = fisher_exact(&table(vec![vec![1, 2], vec![3, 4], vec![5, 6]]));
        assert!(matches!(result, Err(StatError::NotTwoByTwo { .. })));
    }
}
