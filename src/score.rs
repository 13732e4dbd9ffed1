use log::warn;
use statrs::{
    function::beta::checked_beta_reg,
    statistics::{Data, Median, Statistics},
};

use crate::{math::arithmetic_mean, record::PeptideRecord};

/// Descriptive statistics of presentation scores
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
}
impl ScoreSummary {
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }
        Self {
            count: scores.len(),
            mean: arithmetic_mean(scores),
            median: Data::new(scores.to_vec()).median(),
            std: Statistics::population_variance(scores).sqrt(),
            min: scores.iter().copied().fold(f64::INFINITY, f64::min),
            max: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Scores of one modification split by anchor status
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreComparison {
    pub modification: String,
    pub anchor: ScoreSummary,
    pub non_anchor: ScoreSummary,
    pub t_statistic: f64,
    pub p_value: f64,
}

/// Welch's unequal-variance t-test, returning `(t, two-sided p)`
///
/// Needs at least two observations per sample; otherwise `t` is NaN and p is 1.
/// A sample holding NaN or infinite values also yields `(NaN, 1)`.
pub fn welch_t_test(x: &[f64], y: &[f64]) -> (f64, f64) {
    if x.len() < 2 || y.len() < 2 {
        return (f64::NAN, 1.0);
    }
    let (nx, ny) = (x.len() as f64, y.len() as f64);
    let (mx, my) = (arithmetic_mean(x), arithmetic_mean(y));
    let (vx, vy) = (
        Statistics::variance(x) / nx,
        Statistics::variance(y) / ny,
    );

    if vx + vy == 0.0 {
        return if mx == my {
            (0.0, 1.0)
        } else {
            (f64::INFINITY.copysign(mx - my), 0.0)
        };
    }

    let t = (mx - my) / (vx + vy).sqrt();
    let df = (vx + vy).powi(2) / (vx.powi(2) / (nx - 1.0) + vy.powi(2) / (ny - 1.0));
    match checked_beta_reg(df / 2.0, 0.5, df / (df + t * t)) {
        Ok(p) => (t, p.clamp(0.0, 1.0)),
        Err(_) => (f64::NAN, 1.0),
    }
}

/// Compares the scores of `modification` at anchor and non-anchor positions
///
/// Records with a NaN or infinite score are left out with a warning.
pub fn compare_scores(records: &[PeptideRecord], modification: &str) -> ScoreComparison {
    let (anchor, non_anchor): (Vec<&PeptideRecord>, Vec<&PeptideRecord>) = records
        .iter()
        .filter(|r| r.modification == modification)
        .filter(|r| {
            if !r.score.is_finite() {
                warn!(
                    "Ignoring {} score {} in batch {}",
                    modification, r.score, r.batch_id
                );
            }
            r.score.is_finite()
        })
        .partition(|r| r.anchor.is_anchor());
    let anchor = anchor.iter().map(|r| r.score).collect::<Vec<_>>();
    let non_anchor = non_anchor.iter().map(|r| r.score).collect::<Vec<_>>();

    let (t_statistic, p_value) = welch_t_test(&anchor, &non_anchor);
    ScoreComparison {
        modification: modification.to_string(),
        anchor: ScoreSummary::from_scores(&anchor),
        non_anchor: ScoreSummary::from_scores(&non_anchor),
        t_statistic,
        p_value,
    }
}
