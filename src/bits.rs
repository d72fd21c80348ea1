//! Bit-level output for the range coder.

/// A bit writer that packs bits MSB first and can propagate a carry
/// back into bits it has already written.
///
/// Range coding narrows an interval whose lower bound may overflow into
/// bits that were shifted out earlier, so written bits stay mutable until
/// the stream is finished.
#[derive(Debug, Clone)]
pub struct BitWriter {
    buffer: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    /// Create a new bit writer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new bit writer with specified byte capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            bit_len: 0,
        }
    }

    /// Append one bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        let bit_position = self.bit_len & 7;
        if bit_position == 0 {
            self.buffer.push(0);
        }
        if bit {
            let last = self.buffer.len() - 1;
            self.buffer[last] |= 0x80 >> bit_position;
        }
        self.bit_len += 1;
    }

    /// Add one to the written bits viewed as a big binary number.
    ///
    /// Trailing ones flip to zero until a zero absorbs the carry. Returns
    /// `false` if the carry ran off the front of the stream.
    pub fn add_carry(&mut self) -> bool {
        let mut index = self.bit_len;
        while index > 0 {
            index -= 1;
            let byte = &mut self.buffer[index >> 3];
            let mask = 0x80 >> (index & 7);
            if *byte & mask == 0 {
                *byte |= mask;
                return true;
            }
            *byte &= !mask;
        }
        false
    }

    /// Number of bits written so far.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Discard everything written, keeping the allocation.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.bit_len = 0;
    }

    /// The written bytes; the final byte is zero padded.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(writer: &mut BitWriter, bits: &str) {
        for c in bits.chars().filter(|c| *c != '_') {
            writer.write_bit(c == '1');
        }
    }

    #[test]
    fn test_bit_writer_msb_order() {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        writer.write_bit(false);
        writer.write_bit(true);
        writer.write_bit(true);
        assert_eq!(writer.bit_len(), 4);
        assert_eq!(writer.finish(), vec![0b1011_0000]);
    }

    #[test]
    fn test_carry_stops_at_first_zero() {
        let mut writer = BitWriter::new();
        write(&mut writer, "0100_1111_11");
        assert!(writer.add_carry());
        // 01001111 11 + 1 = 01010000 00
        assert_eq!(writer.bit_len(), 10);
        assert_eq!(writer.finish(), vec![0b0101_0000, 0b0000_0000]);
    }

    #[test]
    fn test_carry_overflow() {
        let mut writer = BitWriter::new();
        write(&mut writer, "111");
        assert!(!writer.add_carry());
        assert_eq!(writer.finish(), vec![0]);

        let mut empty = BitWriter::new();
        assert!(!empty.add_carry());
    }

    #[test]
    fn test_clear_starts_over() {
        let mut writer = BitWriter::with_capacity(4);
        write(&mut writer, "1010_1010_1");
        writer.clear();
        assert_eq!(writer.bit_len(), 0);
        write(&mut writer, "01");
        assert_eq!(writer.finish(), vec![0b0100_0000]);
    }
}
