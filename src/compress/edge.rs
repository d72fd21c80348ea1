//! Arena of reference-counted parse edges.
//!
//! An edge is one step of a candidate parse: a reference starting at
//! `pos`, together with the cheapest known total size of a parse taking
//! it. Edges point back to the edge they extend, forming a DAG rooted at
//! a synthetic zero-length edge. Every index holding an edge, and every
//! edge extending it, owns one count; an edge is freed when its count
//! drops to zero, releasing its source in turn.

use super::heap::HeapSlots;
use crate::error::{Error, Result};

/// Stable handle to an edge in an [`EdgePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EdgeId(u32);

/// One candidate parse step.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    /// Position where the reference starts.
    pub pos: u32,
    /// Reference offset; 0 for the root.
    pub offset: u32,
    /// Reference length; 0 for the root.
    pub length: u32,
    /// Estimated size of the whole buffer when parsed through this edge.
    pub total_size: u64,
    /// Edge this one extends; `None` for the root.
    pub source: Option<EdgeId>,
    refcount: u32,
    heap_index: Option<usize>,
}

impl Edge {
    /// Position just past the referenced bytes.
    #[inline]
    pub fn target(&self) -> u32 {
        self.pos + self.length
    }
}

/// Usage counters reported after a compression run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeStats {
    /// Largest number of edges alive at once.
    pub peak_edges: usize,
    /// Edges freed to stay within the budget, over all parses.
    pub evicted_edges: usize,
    /// Edges created while the pool was already at its budget, because
    /// nothing could be evicted. Live edges exceed the budget by at most
    /// this many.
    pub over_budget_allocations: usize,
}

/// Per-run owner of all edges with a soft limit on live edges.
#[derive(Debug)]
pub struct EdgePool {
    edges: Vec<Edge>,
    free: Vec<EdgeId>,
    live: usize,
    max_edges: usize,
    stats: EdgeStats,
}

impl EdgePool {
    /// Create an empty pool that tries to keep at most `max_edges` alive.
    pub fn new(max_edges: usize) -> Self {
        Self {
            edges: Vec::new(),
            free: Vec::new(),
            live: 0,
            max_edges,
            stats: EdgeStats::default(),
        }
    }

    /// Edges currently alive.
    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    /// Whether another edge would exceed the budget.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.live >= self.max_edges
    }

    /// Counters accumulated since the pool was created.
    pub fn stats(&self) -> EdgeStats {
        self.stats
    }

    pub(crate) fn record_evicted(&mut self, count: usize) {
        self.stats.evicted_edges += count;
    }

    /// The edge behind `id`, which must be alive.
    #[inline]
    pub fn get(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0 as usize]
    }

    /// Create an edge with a count of one, taking a count on `source`.
    pub fn alloc(
        &mut self,
        pos: u32,
        offset: u32,
        length: u32,
        total_size: u64,
        source: Option<EdgeId>,
    ) -> Result<EdgeId> {
        let edge = Edge {
            pos,
            offset,
            length,
            total_size,
            source,
            refcount: 1,
            heap_index: None,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.edges[id.0 as usize] = edge;
                id
            }
            None => {
                let index = u32::try_from(self.edges.len())
                    .map_err(|_| Error::oom("parse edges", self.edges.len() + 1))?;
                self.edges
                    .try_reserve(1)
                    .map_err(|_| Error::oom("parse edges", self.edges.len() + 1))?;
                // Room to free every slot, so release never allocates.
                self.free
                    .try_reserve(self.edges.len() + 1 - self.free.len())
                    .map_err(|_| Error::oom("free edge slots", self.edges.len() + 1))?;
                self.edges.push(edge);
                EdgeId(index)
            }
        };
        if let Some(source) = source {
            assert_ne!(source, id, "edge cannot extend itself");
            self.edges[source.0 as usize].refcount += 1;
        }
        if self.is_full() {
            self.stats.over_budget_allocations += 1;
        }
        self.live += 1;
        self.stats.peak_edges = self.stats.peak_edges.max(self.live);
        Ok(id)
    }

    /// Drop one count on `id`, freeing it and its now-unowned sources.
    pub fn release(&mut self, id: EdgeId) {
        let mut current = Some(id);
        while let Some(id) = current {
            let edge = &mut self.edges[id.0 as usize];
            debug_assert!(edge.refcount > 0, "edge released more often than owned");
            edge.refcount -= 1;
            if edge.refcount > 0 {
                return;
            }
            assert!(edge.heap_index.is_none(), "freed edge is still tracked");
            current = edge.source.take();
            self.free.push(id);
            self.live -= 1;
        }
    }
}

impl HeapSlots for EdgePool {
    type Id = EdgeId;

    #[inline]
    fn key(&self, id: EdgeId) -> u64 {
        self.get(id).total_size
    }

    #[inline]
    fn heap_index(&self, id: EdgeId) -> Option<usize> {
        self.get(id).heap_index
    }

    #[inline]
    fn set_heap_index(&mut self, id: EdgeId, index: Option<usize>) {
        self.edges[id.0 as usize].heap_index = index;
    }
}
