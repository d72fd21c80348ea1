//! Bit-level reader for range coded streams.

/// Bit reader for MSB-first bit streams.
///
/// Reading past the end of the data yields zero bits, matching the
/// implicit zero tail the encoder relies on when it flushes.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_index: usize,
    overrun: usize,
}

impl<'a> BitReader<'a> {
    /// Create a new bit reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_index: 0,
            overrun: 0,
        }
    }

    /// Read the next bit, or `None` once the data is exhausted.
    #[inline]
    pub fn read_bit(&mut self) -> Option<bool> {
        let byte = *self.data.get(self.bit_index >> 3)?;
        let bit = (byte >> (7 - (self.bit_index & 7))) & 1 != 0;
        self.bit_index += 1;
        Some(bit)
    }

    /// Read the next bit, treating the end of the data as zeros.
    #[inline]
    pub fn read_bit_or_zero(&mut self) -> bool {
        match self.read_bit() {
            Some(bit) => bit,
            None => {
                self.overrun += 1;
                false
            }
        }
    }

    /// Number of bits consumed from the data.
    pub fn position(&self) -> usize {
        self.bit_index
    }

    /// Number of zero bits supplied past the end of the data.
    pub fn overrun(&self) -> usize {
        self.overrun
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_msb_first() {
        let mut reader = BitReader::new(&[0b1010_0001]);
        let bits: Vec<bool> = (0..8).map_while(|_| reader.read_bit()).collect();
        assert_eq!(
            bits,
            vec![true, false, true, false, false, false, false, true]
        );
        assert_eq!(reader.read_bit(), None);
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn test_zero_tail() {
        let mut reader = BitReader::new(&[0xff]);
        for _ in 0..8 {
            assert!(reader.read_bit_or_zero());
        }
        assert_eq!(reader.overrun(), 0);
        for _ in 0..20 {
            assert!(!reader.read_bit_or_zero());
        }
        assert_eq!(reader.overrun(), 20);
        assert_eq!(reader.position(), 8);
    }
}
