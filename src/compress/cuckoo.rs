//! Cuckoo hash map from `u32` keys to small copyable values.
//!
//! Each key has two candidate slots given by two multiplicative hashes.
//! Inserting into a key whose slots are both taken kicks one occupant to
//! its other slot, and so on, for a bounded number of moves before the
//! table doubles. Lookups and removals look at exactly two slots.
//!
//! The parser keeps one map per buffer position, most of which are never
//! used, so the table is only allocated on first insert.

use crate::error::{Error, Result};

/// Key marking an empty slot. Never a valid key.
pub const UNUSED: u32 = u32::MAX;

const HASH1_MUL: u32 = 0xF230_D3A1;
const HASH2_MUL: u32 = 0x8084_027F;
const INITIAL_SIZE_LOG: u32 = 4;

/// Moves attempted before giving up and doubling the table.
const MAX_DISPLACEMENTS: usize = 42;

#[derive(Debug, Clone, Copy)]
struct Slot<V> {
    key: u32,
    value: V,
}

/// Open-addressing map with two-choice cuckoo placement.
#[derive(Debug, Clone)]
pub struct CuckooMap<V> {
    slots: Vec<Slot<V>>,
    size_log: u32,
    len: usize,
}

impl<V: Copy + Default> CuckooMap<V> {
    /// Create an empty map. Nothing is allocated until the first insert.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            size_log: INITIAL_SIZE_LOG,
            len: 0,
        }
    }

    /// Number of stored entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the map holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn hashes(&self, key: u32) -> (usize, usize) {
        let f = (key << 1).wrapping_add(1);
        let shift = 32 - self.size_log;
        (
            (f.wrapping_mul(HASH1_MUL) >> shift) as usize,
            (f.wrapping_mul(HASH2_MUL) >> shift) as usize,
        )
    }

    #[inline]
    fn find(&self, key: u32) -> Option<usize> {
        if self.slots.is_empty() {
            return None;
        }
        let (h1, h2) = self.hashes(key);
        if self.slots[h1].key == key {
            Some(h1)
        } else if self.slots[h2].key == key {
            Some(h2)
        } else {
            None
        }
    }

    /// Whether `key` is stored.
    #[inline]
    pub fn contains_key(&self, key: u32) -> bool {
        self.find(key).is_some()
    }

    /// Value stored under `key`.
    #[inline]
    pub fn get(&self, key: u32) -> Option<V> {
        self.find(key).map(|i| self.slots[i].value)
    }

    /// Insert or overwrite `key`, returning the previous value.
    ///
    /// Fails with [`Error::OutOfMemory`] if the table cannot grow. The map
    /// may then have lost one of its other entries.
    pub fn insert(&mut self, key: u32, value: V) -> Result<Option<V>> {
        assert_ne!(key, UNUSED, "the empty-slot key cannot be stored");
        if let Some(i) = self.find(key) {
            return Ok(Some(std::mem::replace(&mut self.slots[i].value, value)));
        }
        if self.slots.is_empty() {
            self.slots = Self::empty_slots(1 << self.size_log)?;
        }
        self.len += 1;
        if let Err(e) = self.place(key, value) {
            // One entry, not necessarily this one, was left without a slot.
            self.len -= 1;
            return Err(e);
        }
        Ok(None)
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: u32) -> Option<V> {
        let i = self.find(key)?;
        let slot = std::mem::replace(
            &mut self.slots[i],
            Slot {
                key: UNUSED,
                value: V::default(),
            },
        );
        self.len -= 1;
        Some(slot.value)
    }

    /// Remove every entry and release the table.
    pub fn clear(&mut self) {
        self.slots = Vec::new();
        self.size_log = INITIAL_SIZE_LOG;
        self.len = 0;
    }

    /// Iterate over live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, V)> + '_ {
        self.slots
            .iter()
            .filter(|s| s.key != UNUSED)
            .map(|s| (s.key, s.value))
    }

    /// Iterate over live values in slot order.
    pub fn values(&self) -> impl Iterator<Item = V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    fn empty_slots(len: usize) -> Result<Vec<Slot<V>>> {
        #[cfg(test)]
        alloc_failure::check(len)?;
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(len)
            .map_err(|_| Error::oom("offset table slots", len))?;
        slots.resize(
            len,
            Slot {
                key: UNUSED,
                value: V::default(),
            },
        );
        Ok(slots)
    }

    /// Place a key known to be absent, growing the table as needed.
    fn place(&mut self, key: u32, value: V) -> Result<()> {
        let mut pending = Slot { key, value };
        while let Err(homeless) = self.try_place(pending) {
            pending = homeless;
            self.grow()?;
        }
        Ok(())
    }

    /// Cuckoo insertion. On failure, returns the entry left without a slot,
    /// which is not necessarily the one passed in.
    fn try_place(&mut self, mut entry: Slot<V>) -> std::result::Result<(), Slot<V>> {
        let (h1, h2) = self.hashes(entry.key);
        if self.slots[h1].key == UNUSED {
            self.slots[h1] = entry;
            return Ok(());
        }
        if self.slots[h2].key == UNUSED {
            self.slots[h2] = entry;
            return Ok(());
        }

        let mut hash = h1;
        let mut budget = MAX_DISPLACEMENTS;
        while self.slots[hash].key != UNUSED {
            if budget == 0 {
                return Err(entry);
            }
            budget -= 1;
            std::mem::swap(&mut entry, &mut self.slots[hash]);
            // The evicted entry moves to whichever of its slots it was not in.
            let (e1, e2) = self.hashes(entry.key);
            hash ^= e1 ^ e2;
        }
        self.slots[hash] = entry;
        Ok(())
    }

    /// Double the table. Entries move only once the new table exists.
    fn grow(&mut self) -> Result<()> {
        let size_log = self.size_log + 1;
        let mut grown = Self {
            slots: Self::empty_slots(1 << size_log)?,
            size_log,
            len: self.len,
        };
        for slot in self.slots.iter().filter(|s| s.key != UNUSED) {
            grown.place(slot.key, slot.value)?;
        }
        *self = grown;
        Ok(())
    }
}


impl<V: Copy + Default> Default for CuckooMap<V> {
    fn default() -> Self {
        Self::new()
    }
}
