//! Single-table analysis of every batch merged together.

use log::info;

use crate::{
    aggregate::{batch_enrichment, batch_group_comparison},
    config::Correction,
    correction::{correct, CorrectionResult},
    error::MetaError,
    record::PeptideRecord,
    results::{CorrectedTable, EffectSizeRecord, GroupComparisonRecord, TestedRow},
};

/// Batch and group label carried by records built from the merged data
pub const POOLED_LABEL: &str = "all";

/// Sorts rows by ascending p (ties by modification) and corrects across them
fn corrected<T: TestedRow>(mut rows: Vec<T>) -> Result<CorrectedTable<T>, MetaError> {
    rows.sort_by(|a, b| {
        a.p_value()
            .total_cmp(&b.p_value())
            .then_with(|| a.modification().cmp(b.modification()))
    });
    let pvalues = rows.iter().map(|r| r.p_value()).collect::<Vec<_>>();
    Ok(CorrectedTable {
        bonferroni: correct(&pvalues, Correction::Bonferroni)?,
        fdr: correct(&pvalues, Correction::Fdr)?,
        rows,
    })
}

/// Every modification against the rest over all records, regardless of batch or group
pub fn pooled_enrichment(
    records: &[PeptideRecord],
) -> Result<CorrectedTable<EffectSizeRecord>, MetaError> {
    let all = records.iter().collect::<Vec<_>>();
    corrected(batch_enrichment(&all, POOLED_LABEL, POOLED_LABEL))
}

/// Tumor against normal per modification over all batches combined
///
/// Empty unless both groups have records.
pub fn pooled_group_comparison(
    records: &[PeptideRecord],
    tumor: &str,
    normal: &str,
) -> Result<CorrectedTable<GroupComparisonRecord>, MetaError> {
    let all = records.iter().collect::<Vec<_>>();
    let rows = if all.iter().any(|r| r.group == tumor) && all.iter().any(|r| r.group == normal) {
        batch_group_comparison(&all, POOLED_LABEL, tumor, normal)
    } else {
        Vec::new()
    };
    corrected(rows)
}

/// Counts of tumor-vs-normal differences passing a significance threshold
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupDifferenceSummary {
    pub total_modifications: usize,
    pub significant_raw: usize,
    pub significant_bonferroni: usize,
    pub significant_fdr: usize,
    /// Modification with the smallest raw p-value
    pub most_significant: Option<String>,
    /// Observed in tumor with higher anchor odds than in normal
    pub enriched_in_tumor: usize,
    /// Observed in tumor with lower anchor odds than in normal
    pub depleted_in_tumor: usize,
}

/// Summarises a tumor-vs-normal table at threshold `alpha` (strict `<`)
pub fn summarize_group_differences(
    table: &CorrectedTable<GroupComparisonRecord>,
    alpha: f64,
) -> GroupDifferenceSummary {
    let passing = |correction: &CorrectionResult| {
        correction
            .entries
            .iter()
            .filter(|e| e.adjusted < alpha)
            .count()
    };
    let in_tumor = table.rows.iter().filter(|r| r.tumor.total() > 0);

    GroupDifferenceSummary {
        total_modifications: table.len(),
        significant_raw: table.rows.iter().filter(|r| r.p_value < alpha).count(),
        significant_bonferroni: passing(&table.bonferroni),
        significant_fdr: passing(&table.fdr),
        most_significant: table.rows.first().map(|r| r.modification.clone()),
        enriched_in_tumor: in_tumor.clone().filter(|r| r.log_or > 0.0).count(),
        depleted_in_tumor: in_tumor.filter(|r| r.log_or < 0.0).count(),
    }
}

/// Results of the merged, batch-agnostic analysis
#[derive(Debug, Clone)]
pub struct PooledAnalysis {
    pub enrichment: CorrectedTable<EffectSizeRecord>,
    pub group_comparison: CorrectedTable<GroupComparisonRecord>,
    pub group_summary: GroupDifferenceSummary,
}

/// Runs enrichment and tumor-vs-normal comparison over the merged records
pub fn pooled_analysis(
    records: &[PeptideRecord],
    tumor: &str,
    normal: &str,
    alpha: f64,
) -> Result<PooledAnalysis, MetaError> {
    let enrichment = pooled_enrichment(records)?;
    let group_comparison = pooled_group_comparison(records, tumor, normal)?;
    let group_summary = summarize_group_differences(&group_comparison, alpha);
    info!(
        "Pooled analysis: {} modifications, {} group differences (FDR < {})",
        enrichment.len(),
        group_summary.significant_fdr,
        alpha
    );
    Ok(PooledAnalysis {
        enrichment,
        group_comparison,
        group_summary,
    })
}
