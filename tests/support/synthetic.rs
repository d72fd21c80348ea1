//! Synthetic test data generation.
//!
//! Generates deterministic byte buffers with controlled redundancy for
//! testing the compressor. All functions produce reproducible output
//! suitable for regression testing.

#![allow(dead_code)]

use rand::{rngs::StdRng, Rng, SeedableRng};

/// A single byte repeated.
pub fn run(byte: u8, len: usize) -> Vec<u8> {
    vec![byte; len]
}

/// `len` bytes that never repeat a two-byte sequence (for `len <= 256`).
pub fn distinct(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}

/// Uniformly random bytes.
pub fn random(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

/// Random bytes drawn from a small alphabet.
pub fn small_alphabet(seed: u64, len: usize, alphabet: &[u8]) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect()
}

/// Words picked at random from a fixed vocabulary, separated by spaces.
pub fn text(seed: u64, len: usize) -> Vec<u8> {
    const WORDS: &[&str] = &[
        "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "and", "a",
        "compressor", "packs", "every", "byte", "it", "can", "find",
    ];
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(len + 16);
    while out.len() < len {
        out.extend_from_slice(WORDS[rng.gen_range(0..WORDS.len())].as_bytes());
        out.push(b' ');
    }
    out.truncate(len);
    out
}

/// Little-endian 16-bit samples of a slowly varying sequence, the kind of
/// data that benefits from parity contexts.
pub fn words16(seed: u64, count: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut value: i32 = 0;
    let mut out = Vec::with_capacity(count * 2);
    for _ in 0..count {
        value = (value + rng.gen_range(-3..=3)).clamp(0, 255);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    }
    out
}

/// Random blocks copied back in at random distances.
pub fn with_repeats(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out: Vec<u8> = (0..16).map(|_| rng.gen()).collect();
    while out.len() < len {
        if rng.gen_bool(0.3) {
            out.push(rng.gen());
        } else {
            let offset = rng.gen_range(1..=out.len());
            let length = rng.gen_range(2..40);
            let from = out.len() - offset;
            for i in 0..length {
                out.push(out[from + i]);
            }
        }
    }
    out.truncate(len);
    out
}
