//! Adaptive binary range decoder.

use super::bit_reader::BitReader;
use crate::coder::range::{adapt, INITIAL_PROBABILITY, MIN_RANGE};
use crate::error::{Error, Result};

/// Longest unary prefix a number code may have while fitting in `u32`.
const MAX_NUMBER_PREFIX: usize = 30;

/// A complete stream never needs more zero bits past its end than this.
const MAX_OVERRUN: usize = 32;

/// Source of context-modelled bits; the inverse of [`crate::coder::Coder`].
pub trait Decoder {
    /// Decode one bit in `context`.
    fn decode(&mut self, context: usize) -> bool;

    /// Decode a number written by [`crate::coder::Coder::encode_number`].
    fn decode_number(&mut self, base_context: usize) -> Result<u32> {
        let mut i = 0;
        while self.decode(base_context + i * 2 + 2) {
            i += 1;
            if i > MAX_NUMBER_PREFIX {
                return Err(Error::CorruptStream(format!(
                    "number prefix longer than {MAX_NUMBER_PREFIX} bits"
                )));
            }
        }

        let mut number = 1u32;
        loop {
            number = (number << 1) | u32::from(self.decode(base_context + i * 2 + 1));
            if i == 0 {
                break;
            }
            i -= 1;
        }
        Ok(number)
    }

    /// Report whether the bits decoded so far are trustworthy.
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// Bit-exact inverse of [`crate::coder::RangeEncoder`].
#[derive(Debug, Clone)]
pub struct RangeDecoder<'a> {
    contexts: Vec<u16>,
    reader: BitReader<'a>,
    range: u32,
    value: u32,
    /// Width of the set of streams consistent with the bits read, once
    /// reading has gone past the end of the data.
    uncertainty: u32,
    ambiguous: bool,
}

impl<'a> RangeDecoder<'a> {
    /// Start decoding `data` with `n_contexts` fresh contexts.
    pub fn new(n_contexts: usize, data: &'a [u8]) -> Self {
        Self {
            contexts: vec![INITIAL_PROBABILITY; n_contexts],
            reader: BitReader::new(data),
            range: 1,
            value: 0,
            uncertainty: 1,
            ambiguous: false,
        }
    }

    /// Zero bits supplied past the end of the data so far.
    pub fn overrun(&self) -> usize {
        self.reader.overrun()
    }
}

impl Decoder for RangeDecoder<'_> {
    fn decode(&mut self, context: usize) -> bool {
        let prob = u32::from(self.contexts[context]);
        while self.range < MIN_RANGE {
            self.range <<= 1;
            let bit = self.reader.read_bit_or_zero();
            if self.reader.overrun() > 0 {
                self.uncertainty = self.uncertainty.saturating_mul(2);
            }
            self.value = (self.value << 1) | u32::from(bit);
        }

        let threshold = (self.range * prob) >> 16;
        let bit = if self.value >= threshold {
            self.value -= threshold;
            self.range -= threshold;
            false
        } else {
            // Some continuation of a truncated stream would decode a zero.
            if self.value.saturating_add(self.uncertainty) > threshold {
                self.ambiguous = true;
            }
            self.range = threshold;
            true
        };
        self.contexts[context] = adapt(prob, bit) as u16;
        bit
    }

    fn check(&self) -> Result<()> {
        if self.ambiguous {
            return Err(Error::CorruptStream(
                "stream ends before its contents are determined".into(),
            ));
        }
        if self.reader.overrun() > MAX_OVERRUN {
            return Err(Error::CorruptStream(format!(
                "read {} bits past the end of the stream",
                self.reader.overrun()
            )));
        }
        Ok(())
    }
}
