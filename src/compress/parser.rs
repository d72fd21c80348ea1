//! Near-optimal LZ parsing over a graph of candidate references.
//!
//! The parser scans positions left to right, keeping for every reference
//! offset the cheapest known parse that ends on a reference with that
//! offset. Keeping one parse per trailing offset, rather than only the
//! overall cheapest, lets a later reference exploit the cheap repeated
//! offset code.
//!
//! At each position:
//! 1. Candidate edges ending here are merged into the per-offset bests,
//!    and the overall best is updated.
//! 2. Every match reported by the [`MatchFinder`], at every length down to
//!    `length_margin` below the reported one, spawns an edge from the
//!    overall best, and another from the best parse ending on the same
//!    offset when that differs.
//! 3. A match of at least `skip_length` bytes is taken unconditionally and
//!    scanning resumes at its end.
//!
//! Edge totals are estimates: the cost of the path up to the edge, the edge
//! itself, and literal coding for everything after it. The number of live
//! edges is kept near `max_edges` by evicting the most expensive ones.

use tracing::{debug, trace};

use super::cuckoo::CuckooMap;
use super::edge::{EdgeId, EdgePool};
use super::heap::IndexedHeap;
use super::lz::LzEncoder;
use super::match_finder::{MatchFinder, MIN_MATCH_LENGTH};
use crate::coder::Coder;
use crate::error::{Error, Result};

/// Parser tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseParams {
    /// How many lengths below each reported match length to also try.
    pub length_margin: usize,
    /// Matches at least this long are taken without alternatives.
    pub skip_length: usize,
    /// Equal-length matches reported per position.
    pub max_same_length: usize,
    /// Distance-one matches kept in a run of one byte.
    pub max_consecutive: usize,
}

/// One reference of a chosen parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    /// Position of the first copied byte.
    pub pos: usize,
    /// Distance back to the source bytes.
    pub offset: usize,
    /// Number of bytes copied.
    pub length: usize,
}

/// The cheapest parse found for a buffer.
#[derive(Debug, Clone)]
pub struct ParseResult<'a> {
    data: &'a [u8],
    zero_padding: usize,
    references: Vec<Reference>,
    estimated_size: u64,
}

impl<'a> ParseResult<'a> {
    /// References in stream order. Bytes between them are literals.
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Size of the parse as estimated while parsing, in fractional bits.
    /// Excludes zero padding and the end marker.
    pub fn estimated_size(&self) -> u64 {
        self.estimated_size
    }

    /// The parsed bytes, without zero padding.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Zero bytes coded after the data.
    pub fn zero_padding(&self) -> usize {
        self.zero_padding
    }

    /// Code the whole parse, zero padding and end marker included.
    /// Returns the total size in fractional bits.
    pub fn encode<C: Coder>(&self, encoder: &mut LzEncoder<C>) -> u64 {
        let mut size = 0;
        let mut pos = 0;
        let mut state = encoder.initial_state();
        for reference in &self.references {
            while pos < reference.pos {
                size += encoder.encode_literal(&mut state, self.data[pos]);
                pos += 1;
            }
            size += encoder.encode_reference(
                &mut state,
                reference.offset as u32,
                reference.length as u32,
            );
            pos += reference.length;
        }
        while pos < self.data.len() {
            size += encoder.encode_literal(&mut state, self.data[pos]);
            pos += 1;
        }

        if self.zero_padding > 0 {
            size += encoder.encode_literal(&mut state, 0);
            if self.zero_padding == 2 {
                size += encoder.encode_literal(&mut state, 0);
            } else if self.zero_padding > 2 {
                size += encoder.encode_reference(&mut state, 1, (self.zero_padding - 1) as u32);
            }
        }
        size + encoder.finish(&state)
    }
}

/// Where an edge tracked by the eviction heap lives.
#[derive(Debug, Clone, Copy)]
enum Container {
    /// Not yet reached: indexed by target position.
    InFlight(usize),
    /// Already reached: indexed among the per-offset bests.
    Arrived,
}

/// Optimal-parse search over one buffer.
pub struct LzParser<'a> {
    data: &'a [u8],
    zero_padding: usize,
    params: ParseParams,
    finder: MatchFinder<'a>,

    /// Literal-only size of the prefix before each position.
    literal_size: Vec<u64>,
    /// Edges still heading for each target position, by offset.
    edges_to_pos: Vec<CuckooMap<EdgeId>>,
    /// Cheapest arrived parse ending on each offset.
    best_for_offset: CuckooMap<EdgeId>,
    /// Evictable edges, most expensive first.
    heap: IndexedHeap<EdgeId>,
    best: EdgeId,
    root: EdgeId,
}

impl<'a> LzParser<'a> {
    /// Set up a parser for `data`. Allocates per-position state up front.
    pub fn new(data: &'a [u8], zero_padding: usize, params: ParseParams) -> Result<Self> {
        let n = data.len();
        let mut literal_size = Vec::new();
        literal_size
            .try_reserve_exact(n + 1)
            .map_err(|_| Error::oom("literal sizes", n + 1))?;
        let mut edges_to_pos = Vec::new();
        edges_to_pos
            .try_reserve_exact(n + 1)
            .map_err(|_| Error::oom("edge indices", n + 1))?;
        edges_to_pos.resize_with(n + 1, CuckooMap::new);

        Ok(Self {
            data,
            zero_padding,
            params,
            finder: MatchFinder::new(data, params.max_same_length, params.max_consecutive)?,
            literal_size,
            edges_to_pos,
            best_for_offset: CuckooMap::new(),
            heap: IndexedHeap::new(),
            best: EdgeId::default(),
            root: EdgeId::default(),
        })
    }

    /// Find the cheapest parse under the costs reported by `encoder`.
    ///
    /// `progress` is called with `(position, length)` as scanning advances.
    /// Every edge allocated from `pool` is released again before returning.
    pub fn parse<C: Coder>(
        &mut self,
        encoder: &mut LzEncoder<C>,
        pool: &mut EdgePool,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<ParseResult<'a>> {
        let n = self.data.len();
        let live_before = pool.live();
        let evicted_before = pool.stats().evicted_edges;
        self.finder.reset();
        self.best_for_offset.clear();
        self.heap.clear(pool);
        for edges in &mut self.edges_to_pos {
            edges.clear();
        }

        self.literal_size.clear();
        let mut size = 0;
        let mut state = encoder.initial_state();
        for &byte in self.data {
            self.literal_size.push(size);
            size += encoder.encode_literal(&mut state, byte);
        }
        self.literal_size.push(size);

        self.root = pool.alloc(0, 0, 0, size, None)?;
        self.best = self.root;

        let mut pos = 1;
        while pos <= n {
            self.assimilate(pool, pos)?;

            let mut max_match_length = 0;
            if pos + MIN_MATCH_LENGTH <= n {
                self.finder.begin_matching(pos);
                while let Some((match_pos, match_length)) = self.finder.next_match() {
                    let offset = (pos - match_pos) as u32;
                    let min_length = match_length
                        .saturating_sub(self.params.length_margin)
                        .max(MIN_MATCH_LENGTH);
                    for length in min_length..=match_length {
                        self.new_edge(encoder, pool, self.best, pos, offset, length as u32)?;
                        if pool.get(self.best).offset != offset {
                            if let Some(source) = self.best_for_offset.get(offset) {
                                debug_assert!(pool.get(source).target() as usize <= pos);
                                self.new_edge(encoder, pool, source, pos, offset, length as u32)?;
                            }
                        }
                    }
                    max_match_length = max_match_length.max(match_length);
                }
            }

            if max_match_length >= self.params.skip_length
                && !self.edges_to_pos[pos + max_match_length].is_empty()
            {
                trace!(pos, length = max_match_length, "skipping long match");
                pos = self.skip_ahead(pool, pos, pos + max_match_length);
            }

            progress(pos, n);
            pos += 1;
        }

        let result = self.extract(pool);
        assert_eq!(
            pool.live(),
            live_before,
            "edges still alive after extracting the parse"
        );
        debug!(
            len = n,
            references = result.references.len(),
            estimated_bits = result.estimated_size >> crate::coder::BIT_PRECISION,
            peak_edges = pool.stats().peak_edges,
            evicted = pool.stats().evicted_edges - evicted_before,
            "parse complete"
        );
        Ok(result)
    }

    /// Merge edges arriving at `pos` into the per-offset bests.
    fn assimilate(&mut self, pool: &mut EdgePool, pos: usize) -> Result<()> {
        let arriving = std::mem::take(&mut self.edges_to_pos[pos]);
        for edge in arriving.values() {
            if pool.get(edge).total_size < pool.get(self.best).total_size {
                self.best = edge;
            }
            self.heap.remove(pool, edge);
            Self::put_by_offset(&mut self.best_for_offset, &mut self.heap, pool, edge)?;
        }
        Ok(())
    }

    /// Index `edge` under its offset unless an equal or cheaper edge is
    /// already there. Takes over the caller's count on `edge`.
    fn put_by_offset(
        by_offset: &mut CuckooMap<EdgeId>,
        heap: &mut IndexedHeap<EdgeId>,
        pool: &mut EdgePool,
        edge: EdgeId,
    ) -> Result<()> {
        debug_assert!(!heap.contains(pool, edge));
        let offset = pool.get(edge).offset;
        match by_offset.get(offset) {
            None => {
                by_offset.insert(offset, edge)?;
                heap.insert(pool, edge)?;
            }
            Some(old) if pool.get(edge).total_size < pool.get(old).total_size => {
                heap.remove(pool, old);
                pool.release(old);
                by_offset.insert(offset, edge)?;
                heap.insert(pool, edge)?;
            }
            Some(_) => pool.release(edge),
        }
        Ok(())
    }

    fn new_edge<C: Coder>(
        &mut self,
        encoder: &mut LzEncoder<C>,
        pool: &mut EdgePool,
        source: EdgeId,
        pos: usize,
        offset: u32,
        length: u32,
    ) -> Result<()> {
        let src = *pool.get(source);
        let src_target = src.target() as usize;
        if offset == src.offset && pos == src_target {
            return Ok(());
        }
        let n = self.data.len();
        let target = pos + length as usize;
        let literal_tail = self.literal_size[n];

        let mut state = encoder.state_at(pos, pos == src_target, src.offset);
        let size_before = src.total_size + self.literal_size[pos] - literal_tail;
        let edge_size = encoder.encode_reference(&mut state, offset, length);
        let size_after = literal_tail - self.literal_size[target];

        let mut evicted = 0;
        while pool.is_full() {
            let live = pool.live();
            if !self.clean_worst_edge(pool, pos, source) {
                break;
            }
            evicted += live - pool.live();
        }
        pool.record_evicted(evicted);
        debug_assert!(
            !pool.is_full() || self.heap.is_empty(),
            "edge budget exceeded with evictable edges left"
        );

        let edge = pool.alloc(
            pos as u32,
            offset,
            length,
            size_before + edge_size + size_after,
            Some(source),
        )?;
        Self::put_by_offset(&mut self.edges_to_pos[target], &mut self.heap, pool, edge)
    }

    /// Drop the most expensive tracked edge if it can be spared.
    /// Returns `false` once nothing is left to try.
    fn clean_worst_edge(&mut self, pool: &mut EdgePool, pos: usize, exclude: EdgeId) -> bool {
        let Some(worst) = self.heap.remove_largest(pool) else {
            return false;
        };
        if worst == self.best || worst == exclude {
            return true;
        }
        let edge = *pool.get(worst);
        let container = if edge.target() as usize > pos {
            Container::InFlight(edge.target() as usize)
        } else {
            Container::Arrived
        };
        let map = match container {
            Container::InFlight(target) => &mut self.edges_to_pos[target],
            Container::Arrived => &mut self.best_for_offset,
        };
        // The last edge of an index stays: it may be the only way there.
        if map.len() > 1 && map.contains_key(edge.offset) {
            map.remove(edge.offset);
            pool.release(worst);
        }
        true
    }

    /// Commit to a long match ending at `target`, dropping every
    /// alternative in between. Returns the last skipped position.
    fn skip_ahead(&mut self, pool: &mut EdgePool, pos: usize, target: usize) -> usize {
        self.heap.clear(pool);
        for edge in self.best_for_offset.values() {
            pool.release(edge);
        }
        self.best_for_offset.clear();

        let mut pos = pos;
        while pos + 1 < target {
            pos += 1;
            let edges = std::mem::take(&mut self.edges_to_pos[pos]);
            for edge in edges.values() {
                pool.release(edge);
            }
        }
        self.best = self.root;
        pos
    }

    /// Walk back from the best edge and release all parse state.
    fn extract(&mut self, pool: &mut EdgePool) -> ParseResult<'a> {
        self.heap.clear(pool);
        let best = self.best;
        for edge in self.best_for_offset.values() {
            if edge != best {
                pool.release(edge);
            }
        }
        self.best_for_offset.clear();

        let mut references = Vec::new();
        let mut current = best;
        loop {
            let edge = pool.get(current);
            let Some(source) = edge.source else { break };
            references.push(Reference {
                pos: edge.pos as usize,
                offset: edge.offset as usize,
                length: edge.length as usize,
            });
            current = source;
        }
        references.reverse();
        let estimated_size = pool.get(best).total_size;

        pool.release(self.root);
        if best != self.root {
            pool.release(best);
        }

        ParseResult {
            data: self.data,
            zero_padding: self.zero_padding,
            references,
            estimated_size,
        }
    }
}
