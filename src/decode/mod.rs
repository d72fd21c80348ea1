//! Decompression of range-coded LZ streams.
//!
//! Decoding is the exact mirror of packing: the same contexts adapt the
//! same way, so the decoder reproduces every probability the encoder used.
//! Streams from untrusted sources are safe to decode; inconsistencies are
//! reported as [`Error::CorruptStream`](crate::Error::CorruptStream).
//! A handful of bytes can still describe gigabytes of output, so untrusted
//! streams should go through [`decompress_with_limit`].

pub mod bit_reader;
pub mod lz;
pub mod range;

pub use bit_reader::BitReader;
pub use lz::LzDecoder;
pub use range::{Decoder, RangeDecoder};

use crate::compress::lz::NUM_CONTEXTS;
use crate::compress::pack::MAX_INPUT_LEN;
use crate::error::Result;

/// Decompress a stream produced by [`crate::compress`].
///
/// Returns the original data followed by its zero padding.
/// `parity_context` must match [`crate::PackOptions::parity_context`].
///
/// Output is capped only at [`MAX_INPUT_LEN`], the largest input
/// [`crate::compress`] accepts. A crafted stream of a few bytes can reach
/// that cap and allocate it in full.
///
/// # Example
///
/// ```rust
/// use shrinkr::{compress, decompress, PackOptions};
///
/// let (packed, _) = compress(b"banana", 2, &PackOptions::default()).unwrap();
/// assert_eq!(decompress(&packed, true).unwrap(), b"banana\0\0");
/// ```
pub fn decompress(stream: &[u8], parity_context: bool) -> Result<Vec<u8>> {
    decompress_with_limit(stream, parity_context, MAX_INPUT_LEN)
}

/// [`decompress`] refusing to produce more than `limit` bytes.
pub fn decompress_with_limit(
    stream: &[u8],
    parity_context: bool,
    limit: usize,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut decoder = LzDecoder::new(RangeDecoder::new(NUM_CONTEXTS, stream), parity_context);
    decoder.decode_into(&mut out, limit)?;
    Ok(out)
}
