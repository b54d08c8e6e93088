use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The one source of randomness used by the pipeline: simulated column fill
/// during reconciliation and experience resampling during normalization.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: StdRng,
    seed: Option<u64>,
}

impl RandomSource {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            seed: None,
        }
    }

    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Uniform integer in the closed range `[low, high]`.
    pub fn int_inclusive(&mut self, low: i64, high: i64) -> i64 {
        if high <= low {
            return low;
        }
        self.rng.random_range(low..=high)
    }

    /// Uniform float in the half-open range `[low, high)`.
    pub fn float_between(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.rng.random_range(low..high)
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.rng.random::<f64>() < probability.clamp(0.0, 1.0)
    }

    /// Picks one option according to its relative weight. Falls back to the
    /// last option when weights do not cover the draw.
    pub fn weighted_pick<'a, T>(&mut self, options: &'a [(T, f64)]) -> Option<&'a T> {
        let total: f64 = options.iter().map(|(_, weight)| weight.max(0.0)).sum();
        if options.is_empty() || total <= 0.0 {
            return None;
        }

        let mut draw = self.rng.random::<f64>() * total;
        for (option, weight) in options {
            let weight = weight.max(0.0);
            if draw < weight {
                return Some(option);
            }
            draw -= weight;
        }
        options.last().map(|(option, _)| option)
    }

    pub fn uniform_pick<'a, T>(&mut self, options: &'a [T]) -> Option<&'a T> {
        if options.is_empty() {
            return None;
        }
        let idx = self.rng.random_range(0..options.len());
        options.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_produces_same_sequence() {
        let mut a = RandomSource::seeded(7);
        let mut b = RandomSource::seeded(7);
        let left: Vec<i64> = (0..32).map(|_| a.int_inclusive(0, 100)).collect();
        let right: Vec<i64> = (0..32).map(|_| b.int_inclusive(0, 100)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn int_inclusive_stays_in_range() {
        let mut rng = RandomSource::seeded(1);
        for _ in 0..1000 {
            let value = rng.int_inclusive(0, 14);
            assert!((0..=14).contains(&value));
        }
        assert_eq!(rng.int_inclusive(5, 5), 5);
    }

    #[test]
    fn weighted_pick_respects_zero_weights() {
        let mut rng = RandomSource::seeded(3);
        let options = [("never", 0.0), ("always", 1.0)];
        for _ in 0..100 {
            assert_eq!(rng.weighted_pick(&options), Some(&"always"));
        }
        let empty: [(&str, f64); 0] = [];
        assert_eq!(rng.weighted_pick(&empty), None);
    }
}
