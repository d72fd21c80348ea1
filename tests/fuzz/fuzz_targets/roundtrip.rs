//! Fuzz target for the compress/decompress round trip.
//!
//! Any data, padding and option set must decode back to the data followed
//! by its zero padding.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shrinkr::{compress, decompress, PackOptions};

/// Structured input for round trip fuzzing.
#[derive(Arbitrary, Debug)]
struct RoundtripInput {
    iterations: u8,
    length_margin: u8,
    skip_length: u16,
    max_same_length: u8,
    max_consecutive: u8,
    zero_padding: u8,
    parity_context: bool,
    /// Raw data to compress
    data: Vec<u8>,
}

fuzz_target!(|input: RoundtripInput| {
    // Limit input size to keep iterations fast
    if input.data.len() > 64 * 1024 {
        return;
    }

    let options = PackOptions {
        iterations: usize::from(input.iterations % 3) + 1,
        length_margin: usize::from(input.length_margin % 8),
        skip_length: usize::from(input.skip_length).max(2),
        max_same_length: usize::from(input.max_same_length).max(1),
        max_consecutive: usize::from(input.max_consecutive).max(1),
        max_edges: 1000,
        parity_context: input.parity_context,
    };
    let zero_padding = usize::from(input.zero_padding);
    if input.data.is_empty() && zero_padding == 0 {
        return;
    }

    let (packed, stats) = compress(&input.data, zero_padding, &options).expect("compress");
    assert_eq!(packed.len(), stats.best_size_bytes());

    let unpacked = decompress(&packed, options.parity_context).expect("decompress");
    assert_eq!(unpacked.len(), input.data.len() + zero_padding);
    assert_eq!(&unpacked[..input.data.len()], &input.data[..]);
    assert!(unpacked[input.data.len()..].iter().all(|&b| b == 0));
});
