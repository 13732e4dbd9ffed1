use crate::{config::Correction, error::MetaError};

/// One adjusted p-value, remembering where it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectedPValue {
    pub original_index: usize,
    pub raw: f64,
    pub adjusted: f64,
}

/// Adjusted p-values in the order of the input
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionResult {
    pub method: Correction,
    pub entries: Vec<CorrectedPValue>,
}
impl CorrectionResult {
    pub fn adjusted(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.adjusted).collect()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.entries.get(index).map(|e| e.adjusted)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Adjusts a family of p-values for multiple testing
///
/// Every p-value must lie in `[0, 1]`; a NaN or out-of-range value is
/// rejected rather than silently propagated into the adjustment.
pub fn correct(pvalues: &[f64], method: Correction) -> Result<CorrectionResult, MetaError> {
    validate_pvalues(pvalues)?;
    let entries = method
        .transform(pvalues)
        .into_iter()
        .zip(pvalues)
        .enumerate()
        .map(|(original_index, (adjusted, &raw))| CorrectedPValue {
            original_index,
            raw,
            adjusted: adjusted.max(raw),
        })
        .collect();
    Ok(CorrectionResult { method, entries })
}

fn validate_pvalues(pvalues: &[f64]) -> Result<(), MetaError> {
    match pvalues
        .iter()
        .enumerate()
        .find(|(_, p)| !(0.0..=1.0).contains(*p))
    {
        Some((index, &value)) => Err(MetaError::InvalidPValue { index, value }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_bonferroni_entries() {
        let result = correct(&[0.01, 0.04, 0.03, 0.2], Correction::Bonferroni).unwrap();
        assert_eq!(result.len(), 4);
        for (entry, expected) in result.entries.iter().zip([0.04, 0.16, 0.12, 0.8]) {
            assert_relative_eq!(entry.adjusted, expected, epsilon = 1e-12);
        }
        assert_eq!(result.entries[2].original_index, 2);
        assert_eq!(result.entries[2].raw, 0.03);
    }

    #[test]
    fn test_fdr_entries_in_original_order() {
        let result = correct(&[0.01, 0.04, 0.03, 0.2], Correction::Fdr).unwrap();
        let adjusted = result.adjusted();
        assert_relative_eq!(adjusted[0], 0.04, epsilon = 1e-12);
        assert_relative_eq!(adjusted[1], 0.0533333333, epsilon = 1e-8);
        assert_relative_eq!(adjusted[2], 0.0533333333, epsilon = 1e-8);
        assert_relative_eq!(adjusted[3], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_invariants_on_random_families() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..100 {
            let n = rng.gen_range(1..50);
            let pvalues = (0..n).map(|_| rng.gen::<f64>()).collect::<Vec<_>>();

            let bonferroni = correct(&pvalues, Correction::Bonferroni).unwrap();
            for entry in &bonferroni.entries {
                assert!(entry.adjusted >= entry.raw);
                assert!(entry.adjusted <= 1.0);
                assert_relative_eq!(entry.adjusted, (entry.raw * n as f64).min(1.0));
            }

            let fdr = correct(&pvalues, Correction::Fdr).unwrap();
            let mut sorted = fdr.entries.clone();
            sorted.sort_by(|a, b| a.raw.total_cmp(&b.raw));
            for entry in &sorted {
                assert!(entry.adjusted >= entry.raw);
                assert!(entry.adjusted <= 1.0);
            }
            for pair in sorted.windows(2) {
                assert!(pair[0].adjusted <= pair[1].adjusted + 1e-15);
            }
        }
    }

    #[test]
    fn test_rejects_invalid_pvalues() {
        assert_eq!(
            correct(&[0.5, 1.5], Correction::Fdr),
            Err(MetaError::InvalidPValue {
                index: 1,
                value: 1.5
            })
        );
        assert!(correct(&[f64::NAN], Correction::Bonferroni).is_err());
    }

    #[test]
    fn test_empty_family() {
        let result = correct(&[], Correction::Fdr).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.get(0), None);
    }
}
