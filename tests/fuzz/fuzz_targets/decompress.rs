//! Fuzz target for decoding untrusted streams.
//!
//! Arbitrary bytes must either decode or fail with an error, never panic
//! or run away with memory.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for parity_context in [true, false] {
        let _ = shrinkr::decompress_with_limit(data, parity_context, 1 << 20);
    }
});
