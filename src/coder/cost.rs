//! Static bit costs derived from observed frequencies.

use super::{Coder, BIT_UNIT};

/// Per-context counts of coded zeros and ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyModel {
    counts: Vec<[u32; 2]>,
}

impl FrequencyModel {
    /// A model with no observations; every bit costs exactly one bit.
    pub fn uniform(n_contexts: usize) -> Self {
        Self {
            counts: vec![[0; 2]; n_contexts],
        }
    }

    pub(crate) fn from_counts(counts: Vec<[u32; 2]>) -> Self {
        Self { counts }
    }

    /// Combine with a newer model. Contexts observed in `newer` take its
    /// counts; contexts it never saw keep the counts from `self`.
    pub fn merge(&self, newer: &FrequencyModel) -> FrequencyModel {
        assert_eq!(self.counts.len(), newer.counts.len());
        let counts = self
            .counts
            .iter()
            .zip(&newer.counts)
            .map(|(old, new)| if *new != [0, 0] { *new } else { *old })
            .collect();
        FrequencyModel { counts }
    }

    /// `[zeros, ones]` observed in `context`.
    #[inline]
    pub fn counts(&self, context: usize) -> [u32; 2] {
        self.counts[context]
    }

    pub(crate) fn counts_slice(&self) -> &[[u32; 2]] {
        &self.counts
    }

    /// Number of contexts covered.
    pub fn n_contexts(&self) -> usize {
        self.counts.len()
    }
}

/// Cost of a bit in 1/64 bit units given counts with add-one smoothing.
fn bit_cost(counts: [u32; 2], bit: usize) -> u64 {
    let hits = f64::from(counts[bit]) + 1.0;
    let total = f64::from(counts[0]) + f64::from(counts[1]) + 2.0;
    (-(hits / total).log2() * BIT_UNIT as f64).round() as u64
}

/// Measures coded sizes under a fixed [`FrequencyModel`].
///
/// Coding through an estimator changes nothing, so the parser can price
/// the same decision any number of times.
#[derive(Debug, Clone)]
pub struct CostEstimator {
    costs: Vec<[u64; 2]>,
}

impl CostEstimator {
    /// Precompute the cost of both bit values in every context of `model`.
    pub fn new(model: &FrequencyModel) -> Self {
        let costs = model
            .counts_slice()
            .iter()
            .map(|&c| [bit_cost(c, 0), bit_cost(c, 1)])
            .collect();
        Self { costs }
    }

    /// Cost of `bit` in `context` without going through the trait.
    #[inline]
    pub fn cost(&self, context: usize, bit: bool) -> u64 {
        self.costs[context][bit as usize]
    }
}

impl Coder for CostEstimator {
    #[inline]
    fn code(&mut self, context: usize, bit: bool) -> u64 {
        self.cost(context, bit)
    }
}
