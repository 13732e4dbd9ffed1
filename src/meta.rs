//! Fixed-effect and DerSimonian-Laird pooling of per-batch log odds ratios.

use itertools::Itertools;
use log::{debug, warn};
use rayon::prelude::*;

use crate::{
    config::{Correction, PoolingModel},
    correction::correct,
    error::MetaError,
    math::{normal_two_sided_pvalue, weighted_mean},
    results::{EffectSizeRecord, GroupComparisonRecord, HeterogeneityResult, MetaTable},
};

/// A single batch's estimate of a modification's log odds ratio
pub trait StudyEffect {
    fn modification(&self) -> &str;
    fn batch_id(&self) -> &str;
    fn log_or(&self) -> f64;
    fn se(&self) -> f64;
}

impl StudyEffect for EffectSizeRecord {
    fn modification(&self) -> &str {
        &self.modification
    }
    fn batch_id(&self) -> &str {
        &self.batch_id
    }
    fn log_or(&self) -> f64 {
        self.log_or
    }
    fn se(&self) -> f64 {
        self.se
    }
}

impl StudyEffect for GroupComparisonRecord {
    fn modification(&self) -> &str {
        &self.modification
    }
    fn batch_id(&self) -> &str {
        &self.batch_id
    }
    fn log_or(&self) -> f64 {
        self.log_or
    }
    fn se(&self) -> f64 {
        self.se
    }
}

/// Heterogeneity statistics around the fixed-effect estimate
#[derive(Debug, Clone, Copy, PartialEq)]
struct Heterogeneity {
    fixed_mean: f64,
    q: f64,
    df: usize,
    tau2: f64,
    i2: f64,
}
impl Heterogeneity {
    fn estimate(log_ors: &[f64], variances: &[f64]) -> Self {
        let weights = variances.iter().map(|v| 1.0 / v).collect::<Vec<_>>();
        let fixed_mean = weighted_mean(log_ors, &weights);
        let df = log_ors.len() - 1;
        if df == 0 {
            return Self {
                fixed_mean,
                q: 0.0,
                df,
                tau2: 0.0,
                i2: 0.0,
            };
        }

        let q = log_ors
            .iter()
            .zip(weights.iter())
            .map(|(x, w)| w * (x - fixed_mean).powi(2))
            .sum::<f64>();
        let sum_w = weights.iter().sum::<f64>();
        let sum_w2 = weights.iter().map(|w| w * w).sum::<f64>();
        let scale = sum_w - sum_w2 / sum_w;
        let excess = q - df as f64;

        // the moment estimator goes negative when batches agree better than
        // sampling error alone predicts
        let tau2 = if scale > 0.0 {
            (excess / scale).max(0.0)
        } else {
            0.0
        };
        let i2 = if q > 0.0 {
            (100.0 * excess / q).clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            fixed_mean,
            q,
            df,
            tau2,
            i2,
        }
    }
}

/// Pools the batch estimates of a single modification
///
/// Batches whose inverse-variance weight is not a finite positive number, or
/// whose estimate is not finite, are dropped with a warning. Fails if no batch
/// remains or the pooled estimate is not finite.
pub fn pool<E: StudyEffect>(
    modification: &str,
    effects: &[E],
    model: PoolingModel,
) -> Result<HeterogeneityResult, MetaError> {
    let (log_ors, variances): (Vec<f64>, Vec<f64>) = effects
        .iter()
        .filter(|e| {
            let usable = e.log_or().is_finite() && has_finite_weight(e.se());
            if !usable {
                warn!(
                    "Excluding batch {} from pooling of {}: logOR={}, SE={}",
                    e.batch_id(),
                    modification,
                    e.log_or(),
                    e.se()
                );
            }
            usable
        })
        .map(|e| (e.log_or(), e.se() * e.se()))
        .unzip();

    if log_ors.is_empty() {
        return Err(MetaError::InsufficientBatches {
            modification: modification.to_string(),
        });
    }

    let heterogeneity = Heterogeneity::estimate(&log_ors, &variances);
    let weights = variances
        .iter()
        .map(|v| model.weight(*v, heterogeneity.tau2))
        .collect::<Vec<_>>();
    let pooled_log_or = weighted_mean(&log_ors, &weights);
    let pooled_se = (1.0 / weights.iter().sum::<f64>()).sqrt();
    let z = pooled_log_or / pooled_se;
    let p_value = normal_two_sided_pvalue(z);
    if !(pooled_log_or.is_finite() && pooled_se.is_finite() && p_value.is_finite()) {
        return Err(MetaError::NonFiniteEstimate {
            modification: modification.to_string(),
        });
    }
    debug!(
        "Pooled {} over {} batches ({}): logOR={:.4}, SE={:.4}, Q={:.3}, tau2={:.4}",
        modification,
        log_ors.len(),
        model.label(),
        pooled_log_or,
        pooled_se,
        heterogeneity.q,
        heterogeneity.tau2
    );

    Ok(HeterogeneityResult {
        modification: modification.to_string(),
        n_batches: log_ors.len(),
        pooled_log_or,
        pooled_se,
        z,
        p_value,
        q: heterogeneity.q,
        df: heterogeneity.df,
        i2: heterogeneity.i2,
        tau2: heterogeneity.tau2,
        method: model,
    })
}

/// A standard error whose inverse variance is a finite, positive weight
fn has_finite_weight(se: f64) -> bool {
    let variance = se * se;
    se.is_finite() && variance > 0.0 && variance.recip().is_finite()
}

/// Pools every modification found in `effects` independently
///
/// Results are ordered by modification name.
pub fn pool_by_modification<E>(
    effects: &[E],
    model: PoolingModel,
) -> Vec<(String, Result<HeterogeneityResult, MetaError>)>
where
    E: StudyEffect + Clone + Send + Sync,
{
    let groups = effects
        .iter()
        .cloned()
        .into_group_map_by(|e| e.modification().to_string())
        .into_iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .collect::<Vec<_>>();

    groups
        .par_iter()
        .map(|(modification, group)| {
            let result = pool(modification, group, model);
            (modification.clone(), result)
        })
        .collect()
}

/// Pools all modifications and applies Bonferroni and BH correction across them
pub fn meta_table<E>(effects: &[E], model: PoolingModel) -> Result<MetaTable, MetaError>
where
    E: StudyEffect + Clone + Send + Sync,
{
    let mut rows = Vec::new();
    let mut failed = Vec::new();
    for (modification, result) in pool_by_modification(effects, model) {
        match result {
            Ok(row) if !(0.0..=1.0).contains(&row.p_value) => {
                let error = MetaError::NonFiniteEstimate {
                    modification: modification.clone(),
                };
                warn!("Meta-analysis skipped for {modification}: {error}");
                failed.push((modification, error));
            }
            Ok(row) => rows.push(row),
            Err(error) => {
                warn!("Meta-analysis skipped for {modification}: {error}");
                failed.push((modification, error));
            }
        }
    }
    rows.sort_by(|a, b| {
        a.p_value
            .total_cmp(&b.p_value)
            .then_with(|| a.modification.cmp(&b.modification))
    });

    let pvalues = rows.iter().map(|r| r.p_value).collect::<Vec<_>>();
    Ok(MetaTable {
        bonferroni: correct(&pvalues, Correction::Bonferroni)?,
        fdr: correct(&pvalues, Correction::Fdr)?,
        rows,
        failed,
    })
}

/// Between-batch spread of a modification's estimates
#[derive(Debug, Clone, PartialEq)]
pub struct HeterogeneitySummary {
    pub modification: String,
    pub n_batches: usize,
    pub q: f64,
    pub i2: f64,
    pub tau2: f64,
    pub mean_log_or: f64,
    pub min_log_or: f64,
    pub max_log_or: f64,
}

/// Summarises heterogeneity for every modification observed in at least two batches
///
/// Sorted by descending I².
pub fn summarize_heterogeneity<E: StudyEffect>(effects: &[E]) -> Vec<HeterogeneitySummary> {
    effects
        .iter()
        .filter(|e| e.log_or().is_finite() && has_finite_weight(e.se()))
        .into_group_map_by(|e| e.modification().to_string())
        .into_iter()
        .filter(|(_, group)| group.len() >= 2)
        .map(|(modification, group)| {
            let log_ors = group.iter().map(|e| e.log_or()).collect::<Vec<_>>();
            let variances = group.iter().map(|e| e.se() * e.se()).collect::<Vec<_>>();
            let heterogeneity = Heterogeneity::estimate(&log_ors, &variances);
            let (min_log_or, max_log_or) = log_ors
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                    (lo.min(*x), hi.max(*x))
                });
            HeterogeneitySummary {
                modification,
                n_batches: group.len(),
                q: heterogeneity.q,
                i2: heterogeneity.i2,
                tau2: heterogeneity.tau2,
                mean_log_or: heterogeneity.fixed_mean,
                min_log_or,
                max_log_or,
            }
        })
        .sorted_by(|a, b| {
            b.i2
                .total_cmp(&a.i2)
                .then_with(|| a.modification.cmp(&b.modification))
        })
        .collect()
}
