use anyhow::{Context, Result};
use log::info;
use rayon::prelude::*;

use crate::{
    aggregate::BatchAggregator,
    config::{AnalysisConfig, AnalysisMode},
    meta::{meta_table, summarize_heterogeneity},
    pooled::pooled_analysis,
    record::PeptideRecord,
    results::{AnchorAnalysisResults, EffectSizeRecord},
    score::{compare_scores, ScoreComparison},
    utils::{count_batches, distinct_modifications},
};

/// Modification enrichment at anchor positions across batches
///
/// In batch mode, runs the whole chain over a borrowed record set:
/// 1. Per-batch enrichment of every modification against the rest
/// 2. Per-batch tumor against normal comparisons
/// 3. Meta-analysis of tumor, normal and tumor-vs-normal effects
/// 4. Heterogeneity summary and anchor score comparisons
///
/// In pooled mode, batches are merged and only the enrichment, the
/// tumor-vs-normal comparison and the score comparisons are produced.
pub struct AnchorAnalysis<'a> {
    records: &'a [PeptideRecord],
    config: AnalysisConfig,
}
impl<'a> AnchorAnalysis<'a> {
    pub fn new(records: &'a [PeptideRecord], config: AnalysisConfig) -> Self {
        Self { records, config }
    }

    pub fn run(&self) -> Result<AnchorAnalysisResults> {
        info!("Scoring {} records", self.records.len());
        match self.config.mode {
            AnalysisMode::Batch => self.run_batches(),
            AnalysisMode::Pooled => self.run_pooled(),
        }
    }

    fn run_batches(&self) -> Result<AnchorAnalysisResults> {
        let aggregator = BatchAggregator::new(self.records);
        let tumor = self.config.tumor_group.as_str();
        let normal = self.config.normal_group.as_str();
        let model = self.config.model;

        let per_batch = aggregator.enrichment(None);
        let group_comparisons = aggregator.group_comparisons(tumor, normal);
        info!(
            "Built {} per-batch effect sizes and {} group comparisons",
            per_batch.len(),
            group_comparisons.len()
        );

        let tumor_effects = self.effects_of(&per_batch, tumor);
        let tumor_meta = meta_table(&tumor_effects, model)
            .context("meta-analysis of tumor enrichment failed")?;

        let normal_batches = count_batches(self.records, normal);
        let normal_meta = if normal_batches >= self.config.min_normal_batches {
            let normal_effects = self.effects_of(&per_batch, normal);
            Some(
                meta_table(&normal_effects, model)
                    .context("meta-analysis of normal enrichment failed")?,
            )
        } else {
            info!(
                "Skipping normal meta-analysis: {} batch(es), need {}",
                normal_batches, self.config.min_normal_batches
            );
            None
        };

        let group_meta = meta_table(&group_comparisons, model)
            .context("meta-analysis of tumor-vs-normal comparisons failed")?;
        info!(
            "Pooled {} tumor, {} group-comparison modifications ({})",
            tumor_meta.len(),
            group_meta.len(),
            model.label()
        );

        Ok(AnchorAnalysisResults {
            heterogeneity: summarize_heterogeneity(&tumor_effects),
            score_comparisons: self.score_comparisons(),
            per_batch,
            group_comparisons,
            tumor_meta,
            normal_meta,
            group_meta,
            pooled: None,
        })
    }

    fn run_pooled(&self) -> Result<AnchorAnalysisResults> {
        let pooled = pooled_analysis(
            self.records,
            &self.config.tumor_group,
            &self.config.normal_group,
            self.config.alpha,
        )
        .context("analysis of merged batches failed")?;
        Ok(AnchorAnalysisResults {
            score_comparisons: self.score_comparisons(),
            pooled: Some(pooled),
            ..Default::default()
        })
    }

    fn score_comparisons(&self) -> Vec<ScoreComparison> {
        distinct_modifications(self.records)
            .par_iter()
            .map(|modification| compare_scores(self.records, modification))
            .collect()
    }

    fn effects_of(&self, per_batch: &[EffectSizeRecord], group: &str) -> Vec<EffectSizeRecord> {
        per_batch
            .iter()
            .filter(|r| r.group == group)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::PoolingModel, record::AnchorTag};

    fn push(
        out: &mut Vec<PeptideRecord>,
        n: usize,
        modification: &str,
        tag: AnchorTag,
        batch: &str,
        group: &str,
    ) {
        for i in 0..n {
            let score = i as f64 * 0.1;
            out.push(PeptideRecord::new(modification, tag, batch, group, score));
        }
    }

    /// Phospho sits on anchors in tumor across three batches; normals are flat
    fn cohort() -> Vec<PeptideRecord> {
        let mut out = Vec::new();
        for (batch, bias) in [("b1", 0), ("b2", 2), ("b3", 4)] {
            push(&mut out, 20 + bias, "Phospho", AnchorTag::Anchor, batch, "Tumor");
            push(&mut out, 6, "Phospho", AnchorTag::NonAnchor, batch, "Tumor");
            push(&mut out, 8, "Oxidation", AnchorTag::Anchor, batch, "Tumor");
            push(&mut out, 24, "Oxidation", AnchorTag::NonAnchor, batch, "Tumor");
            push(&mut out, 10, "Unmodified", AnchorTag::NonAnchor, batch, "Tumor");
            push(&mut out, 5, "Phospho", AnchorTag::Anchor, batch, "Normal");
            push(&mut out, 15, "Phospho", AnchorTag::NonAnchor, batch, "Normal");
            push(&mut out, 5, "Oxidation", AnchorTag::Anchor, batch, "Normal");
            push(&mut out, 15, "Oxidation", AnchorTag::NonAnchor, batch, "Normal");
        }
        out
    }

    #[test]
    fn test_full_run() {
        let records = cohort();
        let results = AnchorAnalysis::new(&records, AnalysisConfig::default())
            .run()
            .unwrap();

        // 3 batches x (3 tumor + 2 normal) modifications
        assert_eq!(results.per_batch.len(), 15);
        assert_eq!(results.group_comparisons.len(), 9);

        let (phospho, _, fdr) = results.tumor_meta.get("Phospho").unwrap();
        assert_eq!(phospho.n_batches, 3);
        assert!(phospho.pooled_log_or > 0.0);
        assert!(fdr < 0.05);
        assert_eq!(results.tumor_meta.rows[0].modification, "Phospho");

        let normal = results.normal_meta.as_ref().unwrap();
        let (flat, _, _) = normal.get("Phospho").unwrap();
        assert!(flat.pooled_log_or.abs() < 1e-9);

        let (group, _, _) = results.group_meta.get("Phospho").unwrap();
        assert!(group.pooled_log_or > 1.0);
        // Unmodified has no normal records in any batch but is still compared
        assert!(results.group_meta.get("Unmodified").is_some());

        assert_eq!(results.heterogeneity.len(), 3);
        assert_eq!(results.score_comparisons.len(), 3);
    }

    #[test]
    fn test_normal_meta_needs_enough_batches() {
        let records = cohort()
            .into_iter()
            .filter(|r| r.group == "Tumor" || r.batch_id == "b1")
            .collect::<Vec<_>>();
        let results = AnchorAnalysis::new(&records, AnalysisConfig::default())
            .run()
            .unwrap();
        assert!(results.normal_meta.is_none());
        assert_eq!(
            results
                .group_comparisons
                .iter()
                .filter(|r| r.batch_id != "b1")
                .count(),
            0
        );
    }

    #[test]
    fn test_fixed_model_and_custom_labels() {
        let records = cohort()
            .into_iter()
            .map(|mut r| {
                r.group = if r.group == "Tumor" { "T".into() } else { "N".into() };
                r
            })
            .collect::<Vec<_>>();
        let config = AnalysisConfig::builder()
            .tumor_group("T")
            .normal_group("N")
            .model(PoolingModel::Fixed)
            .build();
        let results = AnchorAnalysis::new(&records, config).run().unwrap();
        assert!(results
            .tumor_meta
            .rows
            .iter()
            .all(|r| r.method == PoolingModel::Fixed));
        assert_eq!(results.group_meta.len(), 3);
    }

    #[test]
    fn test_pooled_mode() {
        let records = cohort();
        let config = AnalysisConfig::builder().mode(AnalysisMode::Pooled).build();
        let results = AnchorAnalysis::new(&records, config).run().unwrap();

        assert!(results.per_batch.is_empty());
        assert!(results.tumor_meta.is_empty());
        assert!(results.normal_meta.is_none());
        assert_eq!(results.score_comparisons.len(), 3);

        let pooled = results.pooled.unwrap();
        assert_eq!(pooled.enrichment.len(), 3);
        let (phospho, _, _) = pooled.enrichment.get("Phospho").unwrap();
        // 66 tumor + 15 normal anchors, 18 + 45 non-anchors
        assert_eq!((phospho.a, phospho.n), (81, 63));

        assert_eq!(pooled.group_comparison.len(), 3);
        assert_eq!(pooled.group_comparison.rows[0].modification, "Phospho");
        assert_eq!(pooled.group_summary.total_modifications, 3);
        assert_eq!(pooled.group_summary.most_significant.as_deref(), Some("Phospho"));
        assert!(pooled.group_summary.significant_fdr >= 1);
    }

    #[test]
    fn test_batch_run_survives_missing_scores() {
        let mut records = cohort();
        records[0].score = f64::NAN;
        records[1].score = f64::INFINITY;
        let results = AnchorAnalysis::new(&records, AnalysisConfig::default())
            .run()
            .unwrap();
        assert!(results.pooled.is_none());
        let phospho = results
            .score_comparisons
            .iter()
            .find(|c| c.modification == "Phospho")
            .unwrap();
        assert!((0.0..=1.0).contains(&phospho.p_value));
    }

    #[test]
    fn test_empty_input() {
        let results = AnchorAnalysis::new(&[], AnalysisConfig::default())
            .run()
            .unwrap();
        assert!(results.per_batch.is_empty());
        assert!(results.tumor_meta.is_empty());
        assert!(results.normal_meta.is_none());
    }
}
