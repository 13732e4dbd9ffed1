use adjustp::{adjust, Procedure};
use bon::Builder;

/// Source of the per-batch weights in a pooled estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolingModel {
    /// Inverse-variance weights, one shared true effect
    Fixed,
    /// DerSimonian-Laird weights, between-batch variance added to each batch
    Random,
}
impl PoolingModel {
    /// Weight of a batch with sampling variance `variance` given the
    /// between-batch variance estimate `tau2`
    pub fn weight(&self, variance: f64, tau2: f64) -> f64 {
        match self {
            PoolingModel::Fixed => 1.0 / variance,
            PoolingModel::Random => 1.0 / (variance + tau2),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PoolingModel::Fixed => "fixed",
            PoolingModel::Random => "random",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    Identity,
    Fdr,
    Bonferroni,
}
impl Correction {
    pub fn transform(&self, pvalues: &[f64]) -> Vec<f64> {
        if pvalues.is_empty() {
            return Vec::new();
        }
        let adjusted = match self {
            Correction::Identity => pvalues.to_vec(),
            Correction::Fdr => adjust(pvalues, Procedure::BenjaminiHochberg),
            Correction::Bonferroni => adjust(pvalues, Procedure::Bonferroni),
        };
        adjusted.into_iter().map(|p| p.min(1.0)).collect()
    }
}

/// How batches enter the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Score each batch on its own, then pool the per-batch effects
    Batch,
    /// Merge every batch into a single table per modification
    Pooled,
}

/// Settings shared by every stage of an analysis run
#[derive(Debug, Clone, Builder)]
pub struct AnalysisConfig {
    /// Group label of tumor samples
    #[builder(into, default = "Tumor".to_string())]
    pub tumor_group: String,
    /// Group label of normal samples
    #[builder(into, default = "Normal".to_string())]
    pub normal_group: String,
    #[builder(default = PoolingModel::Random)]
    pub model: PoolingModel,
    /// Normal samples are only pooled when they span at least this many batches
    #[builder(default = 2)]
    pub min_normal_batches: usize,
    #[builder(default = AnalysisMode::Batch)]
    pub mode: AnalysisMode,
    /// Significance threshold for the tumor-vs-normal summary of a pooled run
    #[builder(default = 0.05)]
    pub alpha: f64,
}
impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
