use std::f64::consts::SQRT_2;

use statrs::function::{erf::erfc, factorial::ln_binomial};

/// Log of the hypergeometric point probability of `k` in the top-left cell
///
/// `ln[C(row1, k) * C(row2, col1 - k) / C(total, col1)]` evaluated in log-space,
/// so margins in the thousands neither overflow nor lose precision.
pub fn ln_hypergeometric_pmf(k: u64, row1: u64, row2: u64, col1: u64) -> f64 {
    if k > row1 || k > col1 || col1 - k > row2 {
        return f64::NEG_INFINITY;
    }
    ln_binomial(row1, k) + ln_binomial(row2, col1 - k) - ln_binomial(row1 + row2, col1)
}

/// Two-sided tail of the standard normal, `2 * (1 - Phi(|z|))`
///
/// Evaluated through `erfc` to keep precision for large `|z|`.
pub fn normal_two_sided_pvalue(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    erfc(z.abs() / SQRT_2).min(1.0)
}

pub fn arithmetic_mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

pub fn weighted_mean(x: &[f64], weights: &[f64]) -> f64 {
    let sum = x
        .iter()
        .zip(weights.iter())
        .map(|(x, w)| x * w)
        .sum::<f64>();
    sum / weights.iter().sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_hypergeometric_pmf_small() {
        // row1=3, row2=2, col1=2: P(k=1) = C(3,1)C(2,1)/C(5,2) = 6/10
        assert_relative_eq!(
            ln_hypergeometric_pmf(1, 3, 2, 2).exp(),
            0.6,
            epsilon = 1e-12
        );
        assert_eq!(ln_hypergeometric_pmf(3, 3, 2, 2), f64::NEG_INFINITY);
    }

    #[test]
    fn test_hypergeometric_pmf_large_margins_finite() {
        let ln_p = ln_hypergeometric_pmf(2500, 5000, 5000, 5000);
        assert!(ln_p.is_finite());
        assert!(ln_p < 0.0);
    }

    #[test]
    fn test_normal_pvalue() {
        assert_relative_eq!(normal_two_sided_pvalue(0.0), 1.0);
        assert_abs_diff_eq!(normal_two_sided_pvalue(1.959964), 0.05, epsilon = 1e-6);
        assert_relative_eq!(
            normal_two_sided_pvalue(-2.5),
            normal_two_sided_pvalue(2.5)
        );
        assert!(normal_two_sided_pvalue(f64::NAN).is_nan());
    }

    #[test]
    fn test_arithmetic_mean() {
        let x = vec![1., 2., 3.];
        assert_relative_eq!(arithmetic_mean(&x), 2.0);
    }

    #[test]
    fn test_weighted_mean() {
        let x = vec![1., 2., 3.];
        let weights = vec![3.0, 2.0, 1.0];
        assert_relative_eq!(weighted_mean(&x, &weights), 10.0 / 6.0);
    }
}
