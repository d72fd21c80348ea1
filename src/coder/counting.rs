//! Frequency counting coder.

use super::cost::FrequencyModel;
use super::Coder;

/// Tallies coded bits per context.
///
/// Reports zero size for every bit; only the counts matter.
#[derive(Debug, Clone)]
pub struct FrequencyCounter {
    counts: Vec<[u32; 2]>,
}

impl FrequencyCounter {
    /// Start with no observations in `n_contexts` contexts.
    pub fn new(n_contexts: usize) -> Self {
        Self {
            counts: vec![[0; 2]; n_contexts],
        }
    }

    /// Start from the counts already present in `model`.
    pub fn seeded(model: &FrequencyModel) -> Self {
        Self {
            counts: (0..model.n_contexts()).map(|c| model.counts(c)).collect(),
        }
    }

    /// The counts gathered so far as a model.
    #[must_use]
    pub fn into_model(self) -> FrequencyModel {
        FrequencyModel::from_counts(self.counts)
    }
}

impl Coder for FrequencyCounter {
    #[inline]
    fn code(&mut self, context: usize, bit: bool) -> u64 {
        let slot = &mut self.counts[context][bit as usize];
        *slot = slot.saturating_add(1);
        0
    }
}
