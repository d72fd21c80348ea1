//! Iterative packing: parse, measure, refine the model, repeat.
//!
//! The first parse prices every bit at exactly one bit. Each later parse
//! prices bits with the frequencies observed in the parses before it, so
//! the parser learns which symbols the range coder will find cheap. The
//! smallest real encoding over all iterations wins.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::edge::EdgePool;
use super::lz::{LzEncoder, NUM_CONTEXTS};
use super::parser::{LzParser, ParseParams, ParseResult};
use crate::coder::{
    Coder, CostEstimator, FrequencyCounter, FrequencyModel, RangeEncoder, BIT_PRECISION,
};
use crate::error::{Error, Result};

/// Largest input, zero padding included, that positions and offsets can
/// address.
pub const MAX_INPUT_LEN: usize = i32::MAX as usize;

/// Tuning for a packing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackOptions {
    /// Parse-and-refine rounds (1-9, default 2).
    pub iterations: usize,
    /// Shorter lengths tried below each match (0-100, default 2).
    pub length_margin: usize,
    /// Matches this long are taken greedily (2-100000, default 2000).
    pub skip_length: usize,
    /// Equal-length matches reported per position (1-100000, default 20).
    pub max_same_length: usize,
    /// Distance-one matches kept in a byte run (1-100000, default 20).
    pub max_consecutive: usize,
    /// Soft limit on live parse edges (1000-10000000, default 100000).
    pub max_edges: usize,
    /// Select literal contexts by position parity. The decoder must agree.
    pub parity_context: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self::balanced()
    }
}

impl PackOptions {
    /// One pass with a narrow search.
    pub fn fast() -> Self {
        Self {
            iterations: 1,
            length_margin: 0,
            skip_length: 1000,
            max_same_length: 10,
            max_consecutive: 10,
            max_edges: 100_000,
            parity_context: true,
        }
    }

    /// Default settings.
    pub fn balanced() -> Self {
        Self {
            iterations: 2,
            length_margin: 2,
            skip_length: 2000,
            max_same_length: 20,
            max_consecutive: 20,
            max_edges: 100_000,
            parity_context: true,
        }
    }

    /// Widest search; slowest and most memory hungry.
    pub fn max_compression() -> Self {
        Self {
            iterations: 9,
            length_margin: 4,
            skip_length: 10_000,
            max_same_length: 100,
            max_consecutive: 100,
            max_edges: 1_000_000,
            parity_context: true,
        }
    }

    /// Reject any parameter outside its accepted range.
    pub fn validate(&self) -> Result<()> {
        check("iterations", self.iterations, 1, 9)?;
        check("length_margin", self.length_margin, 0, 100)?;
        check("skip_length", self.skip_length, 2, 100_000)?;
        check("max_same_length", self.max_same_length, 1, 100_000)?;
        check("max_consecutive", self.max_consecutive, 1, 100_000)?;
        check("max_edges", self.max_edges, 1000, 10_000_000)?;
        Ok(())
    }

    fn parse_params(&self) -> ParseParams {
        ParseParams {
            length_margin: self.length_margin,
            skip_length: self.skip_length,
            max_same_length: self.max_same_length,
            max_consecutive: self.max_consecutive,
        }
    }
}

fn check(name: &'static str, value: usize, min: usize, max: usize) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name,
            value,
            min,
            max,
        })
    }
}

/// What a packing run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackStats {
    /// Range-coded size in bits after each iteration.
    pub iteration_sizes: Vec<u64>,
    /// Smallest coded size in bits.
    pub best_size: u64,
    /// Zero-based iteration that produced `best_size`.
    pub best_iteration: usize,
    /// References in the chosen parse.
    pub references: usize,
    /// Most parse edges alive at once.
    ///
    /// The edge budget is soft. When every tracked edge is the only way to
    /// reach its position, the parser keeps going over budget instead of
    /// failing, so this can exceed `max_edges` by a wide margin on highly
    /// repetitive data.
    pub peak_edges: usize,
    /// Parse edges dropped to stay within the budget.
    pub evicted_edges: usize,
    /// The edge budget was exceeded; a larger one may compress better.
    pub edge_budget_exceeded: bool,
    /// Time spent parsing, over all iterations.
    pub parse_time: Duration,
    /// Time spent coding and counting, over all iterations.
    pub encode_time: Duration,
}

impl PackStats {
    /// Coded size of the best iteration in whole bytes.
    pub fn best_size_bytes(&self) -> usize {
        self.best_size.div_ceil(8) as usize
    }
}

fn check_input(data: &[u8], zero_padding: usize) -> Result<()> {
    if data.is_empty() && zero_padding == 0 {
        return Err(Error::EmptyInput);
    }
    let len = data.len().saturating_add(zero_padding);
    if len > MAX_INPUT_LEN {
        return Err(Error::InputTooLarge {
            len,
            max: MAX_INPUT_LEN,
        });
    }
    Ok(())
}

/// Pack `data` followed by `zero_padding` zero bytes into `coder`.
///
/// Runs `options.iterations` parses and codes the smallest one into
/// `coder`, end marker included. A [`RangeEncoder`] still needs
/// [`RangeEncoder::finish`] afterwards.
///
/// `progress` receives `(position, length)` while parsing.
pub fn pack_data<C: Coder>(
    data: &[u8],
    zero_padding: usize,
    options: &PackOptions,
    coder: C,
    mut progress: impl FnMut(usize, usize),
) -> Result<PackStats> {
    options.validate()?;
    check_input(data, zero_padding)?;

    let mut pool = EdgePool::new(options.max_edges);
    let mut parser = LzParser::new(data, zero_padding, options.parse_params())?;
    let mut model = FrequencyModel::uniform(NUM_CONTEXTS);
    let mut best: Option<ParseResult<'_>> = None;
    let mut stats = PackStats::default();

    for iteration in 0..options.iterations {
        let start = Instant::now();
        let mut estimator = LzEncoder::new(CostEstimator::new(&model), options.parity_context);
        let result = parser.parse(&mut estimator, &mut pool, &mut progress)?;
        stats.parse_time += start.elapsed();

        let estimated = result.estimated_size() >> BIT_PRECISION;
        let start = Instant::now();
        let mut range = LzEncoder::new(RangeEncoder::new(NUM_CONTEXTS), options.parity_context);
        result.encode(&mut range);
        let mut range = range.into_inner();
        range.finish();
        let size = range.bit_len() as u64;

        let mut counter = LzEncoder::new(FrequencyCounter::seeded(&model), options.parity_context);
        result.encode(&mut counter);
        model = model.merge(&counter.into_inner().into_model());
        stats.encode_time += start.elapsed();

        stats.iteration_sizes.push(size);
        if best.is_none() || size < stats.best_size {
            stats.best_size = size;
            stats.best_iteration = iteration;
            best = Some(result);
        }
        debug!(
            iteration,
            size,
            best = stats.best_size,
            estimated,
            "pack iteration"
        );
    }

    let edge_stats = pool.stats();
    stats.peak_edges = edge_stats.peak_edges;
    stats.evicted_edges = edge_stats.evicted_edges;
    stats.edge_budget_exceeded = edge_stats.peak_edges > options.max_edges;
    if stats.edge_budget_exceeded {
        warn!(
            peak = edge_stats.peak_edges,
            max_edges = options.max_edges,
            "edge budget exceeded; a larger budget may improve compression"
        );
    }

    if let Some(best) = best {
        stats.references = best.references().len();
        let mut encoder = LzEncoder::new(coder, options.parity_context);
        best.encode(&mut encoder);
    }
    Ok(stats)
}

/// Compress `data` plus `zero_padding` zeros into a range-coded stream.
///
/// # Example
///
/// ```rust
/// use shrinkr::{compress, decompress, PackOptions};
///
/// let data = b"hello hello hello hello";
/// let (packed, stats) = compress(data, 0, &PackOptions::fast()).unwrap();
/// assert!(packed.len() < data.len());
/// assert_eq!(stats.iteration_sizes.len(), 1);
/// assert_eq!(decompress(&packed, true).unwrap(), data);
/// ```
pub fn compress(
    data: &[u8],
    zero_padding: usize,
    options: &PackOptions,
) -> Result<(Vec<u8>, PackStats)> {
    compress_with_progress(data, zero_padding, options, |_, _| {})
}

/// [`compress`] reporting parse progress as `(position, length)`.
pub fn compress_with_progress(
    data: &[u8],
    zero_padding: usize,
    options: &PackOptions,
    progress: impl FnMut(usize, usize),
) -> Result<(Vec<u8>, PackStats)> {
    let mut range = RangeEncoder::new(NUM_CONTEXTS);
    let stats = pack_data(data, zero_padding, options, &mut range, progress)?;
    range.finish();
    debug_assert_eq!(range.bit_len() as u64, stats.best_size);
    Ok((range.into_bytes(), stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for options in [
            PackOptions::fast(),
            PackOptions::balanced(),
            PackOptions::max_compression(),
        ] {
            options.validate().unwrap();
        }
        assert_eq!(PackOptions::default(), PackOptions::balanced());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let cases: [(&str, PackOptions); 6] = [
            ("iterations", PackOptions { iterations: 10, ..Default::default() }),
            ("length_margin", PackOptions { length_margin: 101, ..Default::default() }),
            ("skip_length", PackOptions { skip_length: 1, ..Default::default() }),
            ("max_same_length", PackOptions { max_same_length: 0, ..Default::default() }),
            ("max_consecutive", PackOptions { max_consecutive: 100_001, ..Default::default() }),
            ("max_edges", PackOptions { max_edges: 999, ..Default::default() }),
        ];
        for (expected, options) in cases {
            match options.validate() {
                Err(Error::InvalidParameter { name, .. }) => assert_eq!(name, expected),
                other => panic!("{expected}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_input_rejected() {
        let result = compress(&[], 0, &PackOptions::fast());
        assert!(matches!(result, Err(Error::EmptyInput)));
    }

    #[test]
    fn test_empty_input_with_padding() {
        let (packed, stats) = compress(&[], 10, &PackOptions::fast()).unwrap();
        assert!(!packed.is_empty());
        assert_eq!(stats.references, 0);
    }

    #[test]
    fn test_best_size_matches_output() {
        let data = b"abracadabra abracadabra abracadabra".repeat(4);
        let (packed, stats) = compress(&data, 0, &PackOptions::balanced()).unwrap();
        assert_eq!(stats.iteration_sizes.len(), 2);
        assert_eq!(packed.len(), stats.best_size_bytes());
        assert_eq!(
            stats.best_size,
            *stats.iteration_sizes.iter().min().unwrap()
        );
        assert_eq!(stats.iteration_sizes[stats.best_iteration], stats.best_size);
        assert!(stats.references > 0);
    }

    #[test]
    fn test_deterministic() {
        let data = b"determinism determinism determinism".to_vec();
        let a = compress(&data, 3, &PackOptions::default()).unwrap().0;
        let b = compress(&data, 3, &PackOptions::default()).unwrap().0;
        assert_eq!(a, b);
    }

    #[test]
    fn test_progress_reported_each_iteration() {
        let data = b"progress reporting progress reporting";
        let options = PackOptions {
            iterations: 3,
            ..PackOptions::fast()
        };
        let mut completions = 0;
        compress_with_progress(data, 0, &options, |pos, total| {
            if pos == total {
                completions += 1;
            }
        })
        .unwrap();
        assert_eq!(completions, 3);
    }
}
