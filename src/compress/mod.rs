//! Compression engine.
//!
//! [`pack::compress`] is the entry point. The pieces below it can also be
//! driven directly, for example to price a parse with a custom [`Coder`]:
//!
//! - [`match_finder`]: earlier occurrences of the bytes at a position
//! - [`parser`]: cheapest parse over a graph of candidate references
//! - [`lz`]: how literals and references become coded bits
//! - [`pack`]: repeated parsing with refined statistics
//!
//! [`Coder`]: crate::coder::Coder

pub mod cuckoo;
pub mod edge;
pub mod heap;
pub mod lz;
pub mod match_finder;
pub mod pack;
pub mod parser;

pub use cuckoo::CuckooMap;
pub use edge::{EdgePool, EdgeStats};
pub use heap::{HeapSlots, IndexedHeap};
pub use lz::{LzEncoder, LzState, NUM_CONTEXTS};
pub use match_finder::MatchFinder;
pub use pack::{compress, compress_with_progress, pack_data, PackOptions, PackStats};
pub use parser::{LzParser, ParseParams, ParseResult, Reference};
