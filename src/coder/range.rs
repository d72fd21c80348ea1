//! Adaptive binary range encoder.
//!
//! Each context holds a 16-bit estimate of the probability that the next
//! bit is one, nudged toward every bit coded in it by `1/16` of the
//! remaining distance. The coder keeps a 16-bit window of the interval's
//! lower bound; bits leaving the top of the window go to a [`BitWriter`]
//! and a carry out of the window is propagated into them.
//!
//! The arithmetic here must match [`crate::decode::RangeDecoder`] bit for
//! bit.

use std::sync::LazyLock;

use super::{Coder, BIT_PRECISION};
use crate::bits::BitWriter;

/// Shift used when adapting a context probability.
pub const ADJUST_SHIFT: u32 = 4;

/// Initial probability of every context (one half).
pub const INITIAL_PROBABILITY: u16 = 0x8000;

/// The interval is renormalized whenever its width drops below this.
pub(crate) const MIN_RANGE: u32 = 0x8000;

const WINDOW_MASK: u32 = 0xffff;
const CARRY: u32 = 0x10000;

/// `round(64 * log2(range / 0x8000))` for every normalized range.
static RANGE_SIZE: LazyLock<Vec<u8>> = LazyLock::new(|| {
    (MIN_RANGE..=WINDOW_MASK)
        .map(|range| {
            let ratio = f64::from(range) / f64::from(MIN_RANGE);
            (ratio.log2() * f64::from(1u32 << BIT_PRECISION)).round() as u8
        })
        .collect()
});

/// Next probability after coding `bit` in a context whose probability of a
/// one is `prob`.
#[inline]
pub(crate) fn adapt(prob: u32, bit: bool) -> u32 {
    let new_prob = if bit {
        prob + (0xffff >> ADJUST_SHIFT) - (prob >> ADJUST_SHIFT)
    } else {
        prob - (prob >> ADJUST_SHIFT)
    };
    assert!(
        new_prob > 0 && new_prob < 0x10000,
        "context probability {new_prob:#x} left the open interval (0, 0x10000)"
    );
    new_prob
}

/// Adaptive range encoder producing an MSB-first bit stream.
#[derive(Debug, Clone)]
pub struct RangeEncoder {
    contexts: Vec<u16>,
    out: BitWriter,
    low: u32,
    range: u32,
    /// Bits shifted out of the window, including the dropped leading one.
    shifts: u64,
    first_bit_pending: bool,
}

impl RangeEncoder {
    /// Create an encoder with `n_contexts` fresh contexts.
    pub fn new(n_contexts: usize) -> Self {
        Self {
            contexts: vec![INITIAL_PROBABILITY; n_contexts],
            out: BitWriter::new(),
            low: 0,
            range: MIN_RANGE,
            shifts: 0,
            first_bit_pending: true,
        }
    }

    /// Return to the freshly constructed state, discarding output.
    pub fn reset(&mut self) {
        self.contexts.fill(INITIAL_PROBABILITY);
        self.out.clear();
        self.low = 0;
        self.range = MIN_RANGE;
        self.shifts = 0;
        self.first_bit_pending = true;
    }

    /// Information content of everything coded so far, in fractional bits.
    pub fn coded_size(&self) -> u64 {
        let range_size = u64::from(RANGE_SIZE[(self.range - MIN_RANGE) as usize]);
        (self.shifts << BIT_PRECISION) - range_size
    }

    /// Flush the interval with the fewest bits that pin it down.
    ///
    /// Any continuation of the written bits, including all zeros, lies
    /// inside the final interval. Returns the fractional size of the
    /// flush, so the sum of all returned sizes equals the written bits
    /// times `1 << BIT_PRECISION`. Call once, after the last bit.
    pub fn finish(&mut self) -> u64 {
        let before = self.coded_size();
        for k in 1..=16u32 {
            let granule = 1u32 << (16 - k);
            let mut code = (self.low + granule - 1) & !(granule - 1);
            if code + granule <= self.low + self.range {
                if code & CARRY != 0 {
                    self.carry();
                    code &= WINDOW_MASK;
                }
                for i in 0..k {
                    self.emit((code >> (15 - i)) & 1 != 0);
                }
                break;
            }
        }
        ((self.out.bit_len() as u64) << BIT_PRECISION).saturating_sub(before)
    }

    /// Bits written to the output so far.
    pub fn bit_len(&self) -> usize {
        self.out.bit_len()
    }

    /// Written bytes, the last one zero padded.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.out.finish()
    }

    #[inline]
    fn emit(&mut self, bit: bool) {
        // The top bit of the initial window is always zero.
        if self.first_bit_pending {
            debug_assert!(!bit);
            self.first_bit_pending = false;
        } else {
            self.out.write_bit(bit);
        }
    }

    #[inline]
    fn carry(&mut self) {
        let absorbed = self.out.add_carry();
        debug_assert!(absorbed, "carry propagated past the start of the stream");
    }
}

impl Coder for RangeEncoder {
    fn code(&mut self, context: usize, bit: bool) -> u64 {
        let before = self.coded_size();
        let prob = u32::from(self.contexts[context]);
        let threshold = (self.range * prob) >> 16;
        if bit {
            self.range = threshold;
        } else {
            self.low += threshold;
            self.range -= threshold;
        }
        self.contexts[context] = adapt(prob, bit) as u16;

        if self.low & CARRY != 0 {
            self.carry();
            self.low &= WINDOW_MASK;
        }
        while self.range < MIN_RANGE {
            self.emit((self.low >> 15) & 1 != 0);
            self.shifts += 1;
            self.low = (self.low << 1) & WINDOW_MASK;
            self.range <<= 1;
        }
        self.coded_size() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::BIT_UNIT;

    #[test]
    fn test_range_size_table_bounds() {
        assert_eq!(RANGE_SIZE[0], 0);
        assert_eq!(RANGE_SIZE[RANGE_SIZE.len() - 1], 64);
        assert!(RANGE_SIZE.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_first_bit_costs_one_bit() {
        let mut enc = RangeEncoder::new(1);
        assert_eq!(enc.code(0, true), BIT_UNIT);
        let mut enc = RangeEncoder::new(1);
        assert_eq!(enc.code(0, false), BIT_UNIT);
    }

    #[test]
    fn test_probability_adapts() {
        assert_eq!(adapt(0x8000, false), 0x8000 - 0x800);
        assert_eq!(adapt(0x8000, true), 0x8000 + 0xfff - 0x800);

        let mut enc = RangeEncoder::new(1);
        let first = enc.code(0, false);
        let mut last = first;
        for _ in 0..50 {
            last = enc.code(0, false);
        }
        assert!(last < first, "repeated zeros must get cheaper");
    }

    #[test]
    fn test_probability_stays_in_range() {
        let mut prob = u32::from(INITIAL_PROBABILITY);
        for _ in 0..10_000 {
            prob = adapt(prob, true);
        }
        assert!(prob < 0x10000);
        for _ in 0..10_000 {
            prob = adapt(prob, false);
        }
        assert!(prob > 0);
    }

    #[test]
    fn test_total_size_matches_written_bits() {
        let mut enc = RangeEncoder::new(4);
        let mut total = 0;
        let mut seed = 0x1234_5678u32;
        for i in 0..5000 {
            seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
            let bit = (seed >> 28) < 3;
            total += enc.code(i % 4, bit);
        }
        total += enc.finish();
        assert_eq!(total, (enc.bit_len() as u64) << BIT_PRECISION);
    }

    #[test]
    fn test_skewed_input_compresses() {
        let mut enc = RangeEncoder::new(1);
        for _ in 0..8000 {
            enc.code(0, false);
        }
        enc.finish();
        assert!(enc.bit_len() < 8000 / 8);
    }

    #[test]
    fn test_reset_matches_fresh() {
        let mut enc = RangeEncoder::new(2);
        enc.code(0, true);
        enc.code(1, false);
        enc.finish();
        enc.reset();
        assert_eq!(enc.bit_len(), 0);
        assert_eq!(enc.coded_size(), 0);

        let mut fresh = RangeEncoder::new(2);
        for bit in [true, true, false, true] {
            assert_eq!(enc.code(1, bit), fresh.code(1, bit));
        }
    }
}
