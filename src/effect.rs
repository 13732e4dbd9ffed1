use crate::table::ContingencyTable;

/// Pseudo-count added to every cell (Haldane-Anscombe)
pub const CONTINUITY_CORRECTION: f64 = 0.5;

/// Normal quantile used for the default 95% intervals
pub const Z_95: f64 = 1.96;

/// A log odds ratio with its standard error
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectSize {
    pub log_or: f64,
    pub se: f64,
}
impl EffectSize {
    pub fn new(log_or: f64, se: f64) -> Self {
        Self { log_or, se }
    }

    /// Continuity-corrected log odds ratio of a 2x2 table
    ///
    /// Every cell is shifted by 0.5 before the ratio is taken, so the result
    /// is finite for any table of non-negative counts, empty cells included.
    pub fn from_table(table: &ContingencyTable) -> Self {
        let [a, b, c, d] = [table.a, table.b, table.c, table.d]
            .map(|x| x as f64 + CONTINUITY_CORRECTION);
        let log_or = ((a / b) / (c / d)).ln();
        let se = (1.0 / a + 1.0 / b + 1.0 / c + 1.0 / d).sqrt();
        Self { log_or, se }
    }

    pub fn odds_ratio(&self) -> f64 {
        self.log_or.exp()
    }

    pub fn variance(&self) -> f64 {
        self.se * self.se
    }

    pub fn z(&self) -> f64 {
        self.log_or / self.se
    }

    /// Wald interval `log_or ± z * se` on the log scale
    pub fn confidence_interval(&self, z: f64) -> ConfidenceInterval {
        ConfidenceInterval {
            lower: self.log_or - z * self.se,
            upper: self.log_or + z * self.se,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}
impl ConfidenceInterval {
    /// Maps a log-scale interval onto the ratio scale
    pub fn exp(&self) -> Self {
        Self {
            lower: self.lower.exp(),
            upper: self.upper.exp(),
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        self.lower <= x && x <= self.upper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_effect_size_known_table() {
        let effect = EffectSize::from_table(&ContingencyTable::new(10, 5, 3, 20));
        let expected_or = (10.5 / 5.5) / (3.5 / 20.5);
        assert_relative_eq!(effect.odds_ratio(), expected_or, epsilon = 1e-12);
        assert_relative_eq!(effect.odds_ratio(), 11.18, epsilon = 5e-3);
        assert_relative_eq!(effect.log_or, 2.414, epsilon = 1e-3);
        assert_relative_eq!(effect.se, 0.782, epsilon = 1e-3);
    }

    #[test]
    fn test_effect_size_zero_cells() {
        let effect = EffectSize::from_table(&ContingencyTable::new(0, 0, 5, 5));
        assert!(effect.log_or.is_finite());
        assert!(effect.se.is_finite());
        assert_relative_eq!(effect.log_or, 0.0, epsilon = 1e-12);

        let effect = EffectSize::from_table(&ContingencyTable::new(0, 0, 0, 0));
        assert_relative_eq!(effect.log_or, 0.0, epsilon = 1e-12);
        assert_relative_eq!(effect.se, 8.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_effect_size_always_finite() {
        let mut rng = ChaCha8Rng::seed_from_u64(1234);
        for _ in 0..1000 {
            // heavily skewed: one side tiny, the other large
            let table = ContingencyTable::new(
                rng.gen_range(0..3),
                rng.gen_range(0..100_000),
                rng.gen_range(0..100_000),
                rng.gen_range(0..3),
            );
            let effect = EffectSize::from_table(&table);
            assert!(effect.log_or.is_finite());
            assert!(effect.se.is_finite());
            assert!(effect.se > 0.0);
        }
    }

    #[test]
    fn test_effect_size_antisymmetric_under_row_swap() {
        let forward = EffectSize::from_table(&ContingencyTable::new(7, 2, 4, 9));
        let swapped = EffectSize::from_table(&ContingencyTable::new(4, 9, 7, 2));
        assert_relative_eq!(forward.log_or, -swapped.log_or, epsilon = 1e-12);
        assert_relative_eq!(forward.se, swapped.se, epsilon = 1e-12);
    }

    #[test]
    fn test_confidence_interval() {
        let effect = EffectSize::new(0.5, 0.25);
        let ci = effect.confidence_interval(Z_95);
        assert_relative_eq!(ci.lower, 0.01, epsilon = 1e-12);
        assert_relative_eq!(ci.upper, 0.99, epsilon = 1e-12);
        assert!(ci.contains(effect.log_or));

        let or_ci = ci.exp();
        assert_relative_eq!(or_ci.lower, 0.01_f64.exp(), epsilon = 1e-12);
        assert!(or_ci.contains(effect.odds_ratio()));
    }
}
