//! Entropy coders sharing a single bit-coding contract.
//!
//! Every coder consumes `(context, bit)` events and reports what each bit
//! cost in fractional bits. The LZ layer produces those events without
//! knowing whether they are being measured, counted or really encoded:
//!
//! - [`CostEstimator`]: static costs from a [`FrequencyModel`], no state
//! - [`FrequencyCounter`]: tallies bits per context into a new model
//! - [`RangeEncoder`]: adaptive binary range coder producing the stream

pub mod cost;
pub mod counting;
pub mod range;

pub use cost::{CostEstimator, FrequencyModel};
pub use counting::FrequencyCounter;
pub use range::RangeEncoder;

/// Number of fractional bits in the sizes returned by coders.
pub const BIT_PRECISION: u32 = 6;

/// Coded size of one whole bit in fractional units.
pub const BIT_UNIT: u64 = 1 << BIT_PRECISION;

/// A sink for context-modelled bits.
pub trait Coder {
    /// Code `bit` in `context`, returning its size in fractional bits.
    fn code(&mut self, context: usize, bit: bool) -> u64;

    /// Encode a number `>= 2` with a context-modelled Elias-gamma style code.
    ///
    /// A unary prefix of `floor(log2(number / 2))` ones (contexts
    /// `base + 2i + 2`) is closed by a zero, followed by the bits of
    /// `number` below its leading one, most significant first (contexts
    /// `base + 2i + 1`).
    fn encode_number(&mut self, base_context: usize, number: u32) -> u64 {
        assert!(number >= 2, "encode_number requires a number >= 2");
        let mut size = 0;
        let mut i = 0;
        while (4u64 << i) <= u64::from(number) {
            size += self.code(base_context + i * 2 + 2, true);
            i += 1;
        }
        size += self.code(base_context + i * 2 + 2, false);

        loop {
            let bit = (number >> i) & 1 != 0;
            size += self.code(base_context + i * 2 + 1, bit);
            if i == 0 {
                break;
            }
            i -= 1;
        }
        size
    }
}

impl<C: Coder + ?Sized> Coder for &mut C {
    #[inline]
    fn code(&mut self, context: usize, bit: bool) -> u64 {
        (**self).code(context, bit)
    }
}
