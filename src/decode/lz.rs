//! LZ symbol decoding, the inverse of [`crate::compress::lz::LzEncoder`].

use super::range::Decoder;
use crate::compress::lz::{
    kind_context, literal_base, CONTEXT_REPEATED, LENGTH_BASE, OFFSET_BASE,
};
use crate::error::{Error, Result};

/// Offset number of the end-of-stream marker.
const END_OF_STREAM: usize = 0;

/// Rebuilds bytes from a stream of literals and references.
#[derive(Debug)]
pub struct LzDecoder<D> {
    decoder: D,
    parity_mask: usize,
}

impl<D: Decoder> LzDecoder<D> {
    /// `parity_context` must match the setting used when packing.
    pub fn new(decoder: D, parity_context: bool) -> Self {
        Self {
            decoder,
            parity_mask: usize::from(parity_context),
        }
    }

    /// Decode symbols into `out` up to and including the end marker.
    ///
    /// Fails if the stream references data before the start of `out`,
    /// would grow `out` beyond `limit` bytes, or is not a complete stream.
    pub fn decode_into(&mut self, out: &mut Vec<u8>, limit: usize) -> Result<()> {
        let start = out.len();
        let literal = self.decode_literal(0);
        push_checked(out, literal, start, limit)?;

        let mut prev_was_ref = false;
        let mut last_offset = END_OF_STREAM;
        loop {
            self.decoder.check()?;
            let pos = out.len() - start;
            if !self.decoder.decode(kind_context(pos & self.parity_mask)) {
                let literal = self.decode_literal(pos);
                push_checked(out, literal, start, limit)?;
                prev_was_ref = false;
                continue;
            }

            let repeated = !prev_was_ref && self.decoder.decode(CONTEXT_REPEATED);
            let offset = if repeated {
                if last_offset == END_OF_STREAM {
                    return Err(Error::CorruptStream(
                        "repeated offset before any reference".into(),
                    ));
                }
                last_offset
            } else {
                self.decoder.decode_number(OFFSET_BASE)? as usize - 2
            };
            if offset == END_OF_STREAM {
                break;
            }

            let length = self.decoder.decode_number(LENGTH_BASE)? as usize;
            if offset > pos {
                return Err(Error::CorruptStream(format!(
                    "offset {offset} reaches before the start of {pos} decoded bytes"
                )));
            }
            if length > limit - pos {
                return Err(Error::CorruptStream(format!(
                    "output exceeds the limit of {limit} bytes"
                )));
            }
            let from = out.len() - offset;
            // Overlapping copies repeat the bytes as they are written.
            for i in 0..length {
                out.push(out[from + i]);
            }
            prev_was_ref = true;
            last_offset = offset;
        }
        self.decoder.check()
    }

    fn decode_literal(&mut self, pos: usize) -> u8 {
        let base = literal_base(pos & self.parity_mask);
        let mut context = 1;
        for _ in 0..8 {
            let bit = self.decoder.decode(base + context);
            context = (context << 1) | usize::from(bit);
        }
        context as u8
    }
}

fn push_checked(out: &mut Vec<u8>, byte: u8, start: usize, limit: usize) -> Result<()> {
    if out.len() - start >= limit {
        return Err(Error::CorruptStream(format!(
            "output exceeds the limit of {limit} bytes"
        )));
    }
    out.push(byte);
    Ok(())
}
