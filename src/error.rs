use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetaError {
    #[error("no usable batches for modification {modification}; nothing to pool")]
    InsufficientBatches { modification: String },
    #[error("pooled estimate for modification {modification} is not finite")]
    NonFiniteEstimate { modification: String },
    #[error("p-value at index {index} is outside [0, 1]: {value}")]
    InvalidPValue { index: usize, value: f64 },
}
