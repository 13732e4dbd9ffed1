//! anchormeta: modification enrichment at HLA anchor positions across batches
//!
//! This library tests whether post-translational modifications concentrate
//! at the anchor residues of presented peptides, batch by batch, and pools
//! the per-batch evidence into a single estimate per modification.
//!
//! The main components of this library are:
//! - `ContingencyTable`: 2x2 anchor / non-anchor counts
//! - `exact_test`: two-sided exact (Fisher) p-value of a table
//! - `EffectSize`: continuity-corrected log odds ratio and standard error
//! - `BatchAggregator`: per-batch effect sizes and tumor-vs-normal comparisons
//! - `pool` / `meta_table`: fixed-effect and DerSimonian-Laird meta-analysis
//! - `correct`: Bonferroni and Benjamini-Hochberg adjustment
//! - `pooled_analysis`: enrichment and tumor-vs-normal tests over all batches merged
//! - `AnchorAnalysis`: the full chain over a record set, per batch or merged

mod aggregate;
mod analysis;
mod config;
mod correction;
mod effect;
mod error;
mod exact;
mod math;
mod meta;
mod pooled;
mod record;
mod results;
mod score;
mod table;
mod utils;

pub use aggregate::{batch_enrichment, batch_group_comparison, BatchAggregator};
pub use analysis::AnchorAnalysis;
pub use config::{AnalysisConfig, AnalysisMode, Correction, PoolingModel};
pub use correction::{correct, CorrectedPValue, CorrectionResult};
pub use effect::{ConfidenceInterval, EffectSize, CONTINUITY_CORRECTION, Z_95};
pub use error::MetaError;
pub use exact::{exact_test, hypergeometric_support, point_probabilities};
pub use meta::{
    meta_table, pool, pool_by_modification, summarize_heterogeneity, HeterogeneitySummary,
    StudyEffect,
};
pub use pooled::{
    pooled_analysis, pooled_enrichment, pooled_group_comparison, summarize_group_differences,
    GroupDifferenceSummary, PooledAnalysis, POOLED_LABEL,
};
pub use record::{AnchorTag, PeptideRecord};
pub use results::{
    AnchorAnalysisResults, CorrectedTable, EffectSizeRecord, GroupComparisonRecord,
    HeterogeneityResult, MetaTable, TestedRow,
};
pub use score::{compare_scores, welch_t_test, ScoreComparison, ScoreSummary};
pub use table::{tally_by_modification, AnchorCounts, ContingencyTable};
