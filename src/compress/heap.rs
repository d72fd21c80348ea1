//! Indexed binary max-heap over externally stored elements.
//!
//! The heap only stores element ids. Keys and heap positions live with the
//! elements themselves, reached through [`HeapSlots`], so an element can be
//! found and removed from the middle of the heap in `O(log n)`.

use crate::error::{Error, Result};

/// Storage that owns the heap's elements.
pub trait HeapSlots {
    /// Element handle stored in the heap.
    type Id: Copy + Eq;

    /// Ordering key; larger keys are removed first.
    fn key(&self, id: Self::Id) -> u64;

    /// Position of `id` in the heap, if tracked.
    fn heap_index(&self, id: Self::Id) -> Option<usize>;

    /// Record the position of `id`, or that it is no longer tracked.
    fn set_heap_index(&mut self, id: Self::Id, index: Option<usize>);
}

/// Max-heap of ids ordered by [`HeapSlots::key`].
#[derive(Debug, Clone)]
pub struct IndexedHeap<I> {
    items: Vec<I>,
}

impl<I: Copy + Eq> IndexedHeap<I> {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Number of tracked elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is tracked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `id` is currently tracked.
    #[inline]
    pub fn contains<S: HeapSlots<Id = I>>(&self, slots: &S, id: I) -> bool {
        matches!(slots.heap_index(id), Some(i) if i < self.items.len() && self.items[i] == id)
    }

    /// Start tracking `id`, which must not be tracked already.
    pub fn insert<S: HeapSlots<Id = I>>(&mut self, slots: &mut S, id: I) -> Result<()> {
        debug_assert!(!self.contains(slots, id));
        let index = self.items.len();
        self.items
            .try_reserve(1)
            .map_err(|_| Error::oom("eviction heap entries", index + 1))?;
        self.items.push(id);
        slots.set_heap_index(id, Some(index));
        self.sift_up(slots, index);
        Ok(())
    }

    /// Stop tracking `id`. Untracked ids are ignored.
    pub fn remove<S: HeapSlots<Id = I>>(&mut self, slots: &mut S, id: I) {
        if !self.contains(slots, id) {
            return;
        }
        if let Some(index) = slots.heap_index(id) {
            self.remove_at(slots, index);
        }
    }

    /// Remove and return the element with the largest key.
    pub fn remove_largest<S: HeapSlots<Id = I>>(&mut self, slots: &mut S) -> Option<I> {
        if self.items.is_empty() {
            return None;
        }
        Some(self.remove_at(slots, 0))
    }

    /// Untrack every element.
    pub fn clear<S: HeapSlots<Id = I>>(&mut self, slots: &mut S) {
        for id in self.items.drain(..) {
            slots.set_heap_index(id, None);
        }
    }

    fn remove_at<S: HeapSlots<Id = I>>(&mut self, slots: &mut S, index: usize) -> I {
        let removed = self.items.swap_remove(index);
        slots.set_heap_index(removed, None);
        if index < self.items.len() {
            slots.set_heap_index(self.items[index], Some(index));
            let index = self.sift_up(slots, index);
            self.sift_down(slots, index);
        }
        removed
    }

    fn swap<S: HeapSlots<Id = I>>(&mut self, slots: &mut S, a: usize, b: usize) {
        self.items.swap(a, b);
        slots.set_heap_index(self.items[a], Some(a));
        slots.set_heap_index(self.items[b], Some(b));
    }

    fn sift_up<S: HeapSlots<Id = I>>(&mut self, slots: &mut S, mut index: usize) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if slots.key(self.items[parent]) >= slots.key(self.items[index]) {
                break;
            }
            self.swap(slots, parent, index);
            index = parent;
        }
        index
    }

    fn sift_down<S: HeapSlots<Id = I>>(&mut self, slots: &mut S, mut index: usize) {
        let len = self.items.len();
        loop {
            let left = index * 2 + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut child = left;
            if right < len && slots.key(self.items[right]) > slots.key(self.items[left]) {
                child = right;
            }
            if slots.key(self.items[index]) >= slots.key(self.items[child]) {
                break;
            }
            self.swap(slots, index, child);
            index = child;
        }
    }
}

impl<I: Copy + Eq> Default for IndexedHeap<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Keys {
        key: Vec<u64>,
        index: Vec<Option<usize>>,
    }

    impl Keys {
        fn new(keys: &[u64]) -> Self {
            Self {
                key: keys.to_vec(),
                index: vec![None; keys.len()],
            }
        }
    }

    impl HeapSlots for Keys {
        type Id = usize;

        fn key(&self, id: usize) -> u64 {
            self.key[id]
        }

        fn heap_index(&self, id: usize) -> Option<usize> {
            self.index[id]
        }

        fn set_heap_index(&mut self, id: usize, index: Option<usize>) {
            self.index[id] = index;
        }
    }

    #[test]
    fn test_remove_largest_order() {
        let mut keys = Keys::new(&[5, 1, 9, 3, 7, 9, 0]);
        let mut heap = IndexedHeap::new();
        for id in 0..7 {
            heap.insert(&mut keys, id).unwrap();
        }
        let mut popped = Vec::new();
        while let Some(id) = heap.remove_largest(&mut keys) {
            popped.push(keys.key[id]);
        }
        assert_eq!(popped, vec![9, 9, 7, 5, 3, 1, 0]);
        assert!(keys.index.iter().all(Option::is_none));
    }

    #[test]
    fn test_remove_from_middle() {
        let mut keys = Keys::new(&[10, 20, 30, 40, 50]);
        let mut heap = IndexedHeap::new();
        for id in 0..5 {
            heap.insert(&mut keys, id).unwrap();
        }
        heap.remove(&mut keys, 3);
        assert!(!heap.contains(&keys, 3));
        assert!(heap.contains(&keys, 1));
        heap.remove(&mut keys, 3);
        assert_eq!(heap.len(), 4);
        assert_eq!(heap.remove_largest(&mut keys), Some(4));
        assert_eq!(heap.remove_largest(&mut keys), Some(2));
    }

    #[test]
    fn test_clear_untracks() {
        let mut keys = Keys::new(&[1, 2, 3]);
        let mut heap = IndexedHeap::new();
        for id in 0..3 {
            heap.insert(&mut keys, id).unwrap();
        }
        heap.clear(&mut keys);
        assert!(heap.is_empty());
        for id in 0..3 {
            assert!(!heap.contains(&keys, id));
        }
        heap.insert(&mut keys, 1).unwrap();
        assert_eq!(heap.remove_largest(&mut keys), Some(1));
    }
}
