//! Two-sided exact (Fisher) test for 2x2 tables.

use std::ops::RangeInclusive;

use crate::{math::ln_hypergeometric_pmf, table::ContingencyTable};

/// Relative slack when comparing point probabilities against the observed one
const RELATIVE_TOLERANCE: f64 = 1e-7;

/// Feasible values of the top-left cell given the table's margins
pub fn hypergeometric_support(table: &ContingencyTable) -> RangeInclusive<u64> {
    let low = table.col1().saturating_sub(table.row2());
    let high = table.row1().min(table.col1());
    low..=high
}

/// Point probability of every feasible top-left value, in support order
pub fn point_probabilities(table: &ContingencyTable) -> Vec<(u64, f64)> {
    let (row1, row2, col1) = (table.row1(), table.row2(), table.col1());
    hypergeometric_support(table)
        .map(|k| (k, ln_hypergeometric_pmf(k, row1, row2, col1).exp()))
        .collect()
}

/// Two-sided exact p-value for a 2x2 table
///
/// Sums the hypergeometric probabilities of all tables with the observed
/// margins that are no more likely than the observed one. An empty table
/// carries no information and returns 1.
pub fn exact_test(table: &ContingencyTable) -> f64 {
    if table.total() == 0 {
        return 1.0;
    }
    let (row1, row2, col1) = (table.row1(), table.row2(), table.col1());
    let ln_observed = ln_hypergeometric_pmf(table.a, row1, row2, col1);
    let threshold = ln_observed + RELATIVE_TOLERANCE.ln_1p();

    let pvalue = hypergeometric_support(table)
        .map(|k| ln_hypergeometric_pmf(k, row1, row2, col1))
        .filter(|ln_p| *ln_p <= threshold)
        .map(f64::exp)
        .sum::<f64>();
    pvalue.min(1.0)
}
