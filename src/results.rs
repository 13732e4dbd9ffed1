use bon::Builder;

use crate::{
    config::{Correction, PoolingModel},
    correction::CorrectionResult,
    effect::{ConfidenceInterval, EffectSize, Z_95},
    error::MetaError,
    exact::exact_test,
    meta::HeterogeneitySummary,
    pooled::PooledAnalysis,
    score::ScoreComparison,
    table::{AnchorCounts, ContingencyTable},
};

/// Enrichment of one modification at anchor positions within one batch
///
/// `a`/`n` are the anchor/non-anchor counts of the modification itself,
/// `rest_a`/`rest_n` those of every other modification in the same batch and group.
#[derive(Debug, Clone, Builder)]
pub struct EffectSizeRecord {
    #[builder(into)]
    pub modification: String,
    #[builder(into)]
    pub batch_id: String,
    #[builder(into)]
    pub group: String,
    pub a: u64,
    pub n: u64,
    pub rest_a: u64,
    pub rest_n: u64,
    pub log_or: f64,
    pub se: f64,
    pub p_value: f64,
    pub anchor_pct: f64,
    pub total: u64,
}
impl EffectSizeRecord {
    /// Scores a modification-vs-rest table
    pub fn from_table(
        modification: &str,
        batch_id: &str,
        group: &str,
        table: &ContingencyTable,
    ) -> Self {
        let effect = EffectSize::from_table(table);
        EffectSizeRecord::builder()
            .modification(modification)
            .batch_id(batch_id)
            .group(group)
            .a(table.a)
            .n(table.b)
            .rest_a(table.c)
            .rest_n(table.d)
            .log_or(effect.log_or)
            .se(effect.se)
            .p_value(exact_test(table))
            .anchor_pct(table.first_row().anchor_pct())
            .total(table.row1())
            .build()
    }

    pub fn table(&self) -> ContingencyTable {
        ContingencyTable::new(self.a, self.n, self.rest_a, self.rest_n)
    }

    pub fn effect(&self) -> EffectSize {
        EffectSize::new(self.log_or, self.se)
    }
}

/// Tumor against normal for one modification within one batch
///
/// The odds ratio compares the anchor odds of the modification in tumor
/// samples with its anchor odds in normal samples.
#[derive(Debug, Clone)]
pub struct GroupComparisonRecord {
    pub modification: String,
    pub batch_id: String,
    pub tumor: AnchorCounts,
    pub normal: AnchorCounts,
    pub log_or: f64,
    pub se: f64,
    pub p_value: f64,
}
impl GroupComparisonRecord {
    pub fn from_table(modification: &str, batch_id: &str, table: &ContingencyTable) -> Self {
        let effect = EffectSize::from_table(table);
        Self {
            modification: modification.to_string(),
            batch_id: batch_id.to_string(),
            tumor: table.first_row(),
            normal: table.second_row(),
            log_or: effect.log_or,
            se: effect.se,
            p_value: exact_test(table),
        }
    }

    pub fn tumor_anchor_pct(&self) -> f64 {
        self.tumor.anchor_pct()
    }

    pub fn normal_anchor_pct(&self) -> f64 {
        self.normal.anchor_pct()
    }

    pub fn effect(&self) -> EffectSize {
        EffectSize::new(self.log_or, self.se)
    }
}

/// Pooled estimate of one modification across batches
#[derive(Debug, Clone, PartialEq)]
pub struct HeterogeneityResult {
    pub modification: String,
    pub n_batches: usize,
    pub pooled_log_or: f64,
    pub pooled_se: f64,
    pub z: f64,
    pub p_value: f64,
    /// Cochran's Q around the fixed-effect estimate
    pub q: f64,
    pub df: usize,
    /// Share of variation due to heterogeneity, in percent
    pub i2: f64,
    /// DerSimonian-Laird between-batch variance
    pub tau2: f64,
    pub method: PoolingModel,
}
impl HeterogeneityResult {
    pub fn effect(&self) -> EffectSize {
        EffectSize::new(self.pooled_log_or, self.pooled_se)
    }

    pub fn confidence_interval(&self) -> ConfidenceInterval {
        self.effect().confidence_interval(Z_95)
    }

    pub fn odds_ratio(&self) -> f64 {
        self.pooled_log_or.exp()
    }

    pub fn odds_ratio_interval(&self) -> ConfidenceInterval {
        self.confidence_interval().exp()
    }
}

/// Pooled results of one model with both multiple-testing corrections
///
/// Rows are sorted by ascending raw p-value and the corrections are indexed
/// in row order. Modifications that could not be pooled are kept in `failed`.
#[derive(Debug, Clone)]
pub struct MetaTable {
    pub rows: Vec<HeterogeneityResult>,
    pub bonferroni: CorrectionResult,
    pub fdr: CorrectionResult,
    pub failed: Vec<(String, MetaError)>,
}
impl MetaTable {
    pub fn get(&self, modification: &str) -> Option<(&HeterogeneityResult, f64, f64)> {
        let index = self
            .rows
            .iter()
            .position(|r| r.modification == modification)?;
        Some((
            &self.rows[index],
            self.bonferroni.get(index)?,
            self.fdr.get(index)?,
        ))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Modifications passing `threshold` after FDR correction
    pub fn significant(&self, threshold: f64) -> Vec<&HeterogeneityResult> {
        self.rows
            .iter()
            .zip(self.fdr.entries.iter())
            .filter(|(_, e)| e.adjusted < threshold)
            .map(|(r, _)| r)
            .collect()
    }

    pub fn pprint(&self) {
        println!(
            "Modification\tBatches\tOR\tOR_CI_lower\tOR_CI_upper\tLogOR\tSE\tP\tP_bonferroni\tP_fdr\tQ\tI2\tTau2\tMethod"
        );
        for (i, row) in self.rows.iter().enumerate() {
            let ci = row.odds_ratio_interval();
            println!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                row.modification,
                row.n_batches,
                row.odds_ratio(),
                ci.lower,
                ci.upper,
                row.pooled_log_or,
                row.pooled_se,
                row.p_value,
                self.bonferroni.entries[i].adjusted,
                self.fdr.entries[i].adjusted,
                row.q,
                row.i2,
                row.tau2,
                row.method.label(),
            );
        }
        for (modification, error) in &self.failed {
            println!("{modification}\tNA\t# {error}");
        }
    }
}
impl Default for MetaTable {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            bonferroni: CorrectionResult {
                method: Correction::Bonferroni,
                entries: Vec::new(),
            },
            fdr: CorrectionResult {
                method: Correction::Fdr,
                entries: Vec::new(),
            },
            failed: Vec::new(),
        }
    }
}

/// A row tested once per modification
pub trait TestedRow {
    fn modification(&self) -> &str;
    fn p_value(&self) -> f64;
}

impl TestedRow for EffectSizeRecord {
    fn modification(&self) -> &str {
        &self.modification
    }
    fn p_value(&self) -> f64 {
        self.p_value
    }
}

impl TestedRow for GroupComparisonRecord {
    fn modification(&self) -> &str {
        &self.modification
    }
    fn p_value(&self) -> f64 {
        self.p_value
    }
}

/// Rows sorted by ascending raw p with both corrections indexed in row order
#[derive(Debug, Clone)]
pub struct CorrectedTable<T> {
    pub rows: Vec<T>,
    pub bonferroni: CorrectionResult,
    pub fdr: CorrectionResult,
}
impl<T: TestedRow> CorrectedTable<T> {
    pub fn get(&self, modification: &str) -> Option<(&T, f64, f64)> {
        let index = self
            .rows
            .iter()
            .position(|r| r.modification() == modification)?;
        Some((
            &self.rows[index],
            self.bonferroni.get(index)?,
            self.fdr.get(index)?,
        ))
    }
}
impl<T> CorrectedTable<T> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
impl<T> Default for CorrectedTable<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            bonferroni: CorrectionResult {
                method: Correction::Bonferroni,
                entries: Vec::new(),
            },
            fdr: CorrectionResult {
                method: Correction::Fdr,
                entries: Vec::new(),
            },
        }
    }
}
impl CorrectedTable<EffectSizeRecord> {
    pub fn pprint(&self) {
        println!("Modification\tAnchor\tNonAnchor\tTotal\tAnchorPct\tOR\tP\tP_bonferroni\tP_fdr");
        for (i, r) in self.rows.iter().enumerate() {
            println!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                r.modification,
                r.a,
                r.n,
                r.total,
                r.anchor_pct,
                r.effect().odds_ratio(),
                r.p_value,
                self.bonferroni.entries[i].adjusted,
                self.fdr.entries[i].adjusted,
            );
        }
    }
}
impl CorrectedTable<GroupComparisonRecord> {
    pub fn pprint(&self) {
        println!(
            "Modification\tT_anchor\tT_non\tT_anchor_pct\tN_anchor\tN_non\tN_anchor_pct\tOR\tP\tP_bonferroni\tP_fdr"
        );
        for (i, r) in self.rows.iter().enumerate() {
            println!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                r.modification,
                r.tumor.anchor,
                r.tumor.non_anchor,
                r.tumor_anchor_pct(),
                r.normal.anchor,
                r.normal.non_anchor,
                r.normal_anchor_pct(),
                r.effect().odds_ratio(),
                r.p_value,
                self.bonferroni.entries[i].adjusted,
                self.fdr.entries[i].adjusted,
            );
        }
    }
}

/// Everything produced by a full analysis run
///
/// A batch-mode run fills the per-batch and meta-analysis fields and leaves
/// `pooled` empty; a pooled run fills only `pooled` and the score comparisons.
#[derive(Debug, Clone, Default)]
pub struct AnchorAnalysisResults {
    pub per_batch: Vec<EffectSizeRecord>,
    pub group_comparisons: Vec<GroupComparisonRecord>,
    pub tumor_meta: MetaTable,
    /// Absent when normal samples span too few batches
    pub normal_meta: Option<MetaTable>,
    pub group_meta: MetaTable,
    pub heterogeneity: Vec<HeterogeneitySummary>,
    pub score_comparisons: Vec<ScoreComparison>,
    pub pooled: Option<PooledAnalysis>,
}
impl AnchorAnalysisResults {
    pub fn pprint_per_batch(&self) {
        println!("Batch\tGroup\tModification\tA\tN\tRestA\tRestN\tLogOR\tSE\tP\tAnchorPct\tTotal");
        for r in &self.per_batch {
            println!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                r.batch_id,
                r.group,
                r.modification,
                r.a,
                r.n,
                r.rest_a,
                r.rest_n,
                r.log_or,
                r.se,
                r.p_value,
                r.anchor_pct,
                r.total
            );
        }
    }
}
