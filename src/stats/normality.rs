//! Normality tests.
//!
//! Shapiro–Wilk follows Royston's AS R94 approximation and is valid for
//! 3 ≤ n ≤ 5000. Larger samples use D'Agostino–Pearson's K² omnibus test.

use super::{finite, mean, sorted, StatError, StatResult};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

/// Largest sample Shapiro–Wilk is applied to.
pub const SHAPIRO_MAX_N: usize = 5000;

/// Test statistic and p-value of a normality test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalityOutcome {
    pub statistic: f64,
    pub p: f64,
}

const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

/// Evaluate `c[0] + c[1] x + c[2] x² + ...`.
fn poly(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &coef| acc * x + coef)
}

fn std_normal() -> StatResult<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| StatError::Distribution(e.to_string()))
}

/// Shapiro–Wilk W test.
pub fn shapiro_wilk(values: &[f64]) -> StatResult<NormalityOutcome> {
    let n = values.len();
    if n < 3 {
        return Err(StatError::TooFewObservations { needed: 3, got: n });
    }
    let x = sorted(values);
    if x[n - 1] - x[0] < 1e-19 {
        return Err(StatError::IdenticalValues);
    }

    let coef = shapiro_coefficients(n)?;
    let m = mean(&x).ok_or(StatError::NonFinite)?;
    let ssq: f64 = x.iter().map(|v| (v - m).powi(2)).sum();
    let numerator: f64 = coef
        .iter()
        .enumerate()
        .map(|(i, a)| a * (x[n - 1 - i] - x[i]))
        .sum();
    let w = finite((numerator * numerator / ssq).min(1.0))?;

    let p = shapiro_p_value(w, n)?;
    Ok(NormalityOutcome { statistic: w, p })
}

/// Coefficients a_1..a_{n/2} for the upper half of the ordered sample.
fn shapiro_coefficients(n: usize) -> StatResult<Vec<f64>> {
    if n == 3 {
        return Ok(vec![std::f64::consts::FRAC_1_SQRT_2]);
    }

    let normal = std_normal()?;
    let half = n / 2;
    let an = n as f64;
    let m: Vec<f64> = (1..=half)
        .map(|i| normal.inverse_cdf((i as f64 - 0.375) / (an + 0.25)))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / an.sqrt();

    let a1 = poly(&C1, rsn) - m[0] / ssumm2;
    let mut a = vec![0.0; half];
    a[0] = a1;
    let (first_rest, fac) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        a[1] = a2;
        let fac = ((summ2 - 2.0 * m[0].powi(2) - 2.0 * m[1].powi(2))
            / (1.0 - 2.0 * a1.powi(2) - 2.0 * a2.powi(2)))
        .sqrt();
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * m[0].powi(2)) / (1.0 - 2.0 * a1.powi(2))).sqrt();
        (1, fac)
    };
    for i in first_rest..half {
        a[i] = -m[i] / fac;
    }
    Ok(a)
}

fn shapiro_p_value(w: f64, n: usize) -> StatResult<f64> {
    if n == 3 {
        let pw = 6.0 / std::f64::consts::PI * (w.sqrt().asin() - std::f64::consts::PI / 3.0);
        return Ok(pw.clamp(0.0, 1.0));
    }

    let an = n as f64;
    let mut y = (1.0 - w).ln();
    let (m, s) = if n <= 11 {
        let gamma = poly(&G, an);
        if y >= gamma {
            return Ok(1e-99);
        }
        y = -(gamma - y).ln();
        (poly(&C3, an), poly(&C4, an).exp())
    } else {
        let xx = an.ln();
        (poly(&C5, xx), poly(&C6, xx).exp())
    };

    if !y.is_finite() {
        // W == 1: a perfectly normal-looking sample
        return Ok(1.0);
    }
    let p = std_normal()?.sf((y - m) / s);
    Ok(finite(p)?.clamp(0.0, 1.0))
}

/// D'Agostino–Pearson K² test combining skewness and kurtosis.
pub fn dagostino_pearson(values: &[f64]) -> StatResult<NormalityOutcome> {
    let n = values.len();
    if n < 8 {
        return Err(StatError::TooFewObservations { needed: 8, got: n });
    }
    let m = mean(values).ok_or(StatError::NonFinite)?;
    let moment = |k: i32| values.iter().map(|v| (v - m).powi(k)).sum::<f64>() / n as f64;
    let m2 = moment(2);
    if m2 == 0.0 {
        return Err(StatError::IdenticalValues);
    }
    let skew = moment(3) / m2.powf(1.5);
    let kurtosis = moment(4) / (m2 * m2);

    let zs = skew_z(skew, n as f64);
    let zk = kurtosis_z(kurtosis, n as f64);
    let k2 = finite(zs * zs + zk * zk)?;
    let chi2 = ChiSquared::new(2.0).map_err(|e| StatError::Distribution(e.to_string()))?;
    Ok(NormalityOutcome {
        statistic: k2,
        p: chi2.sf(k2).clamp(0.0, 1.0),
    })
}

fn skew_z(b2: f64, n: f64) -> f64 {
    let mut y = b2 * ((n + 1.0) * (n + 3.0) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    if y == 0.0 {
        y = 1.0;
    }
    delta * (y / alpha + ((y / alpha).powi(2) + 1.0).sqrt()).ln()
}

fn kurtosis_z(b2: f64, n: f64) -> f64 {
    let e = 3.0 * (n - 1.0) / (n + 1.0);
    let var_b2 = 24.0 * n * (n - 2.0) * (n - 3.0) / ((n + 1.0) * (n + 1.0) * (n + 3.0) * (n + 5.0));
    let x = (b2 - e) / var_b2.sqrt();
    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0 + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / sqrt_beta1.powi(2)).sqrt());
    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    let term2 = if denom == 0.0 {
        f64::NAN
    } else {
        denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).cbrt()
    };
    (term1 - term2) / (2.0 / (9.0 * a)).sqrt()
}
