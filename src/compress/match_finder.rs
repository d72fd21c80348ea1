//! Hash-chained match finder.
//!
//! Every position is chained to the previous position starting with the
//! same two bytes. For a query position the chain is walked from the
//! nearest candidate outward, and a candidate is reported only when it is
//! at least as long as the previous report. Offsets therefore increase
//! and lengths never decrease along the reported sequence.
//!
//! Two caps keep degenerate inputs fast:
//! - `max_same_length`: equal-length reports allowed before only strictly
//!   longer matches are reported.
//! - `max_consecutive`: in a run of one repeated byte, the chain is
//!   short-circuited past all but this many neighbours.

use crate::error::{Error, Result};

/// Number of distinct two-byte prefixes.
const HASH_SIZE: usize = 1 << 16;

/// Chain terminator.
const END_OF_CHAIN: u32 = u32::MAX;

/// Matches shorter than this are never reported.
pub const MIN_MATCH_LENGTH: usize = 2;

#[inline]
fn prefix(data: &[u8], pos: usize) -> usize {
    (usize::from(data[pos]) << 8) | usize::from(data[pos + 1])
}

fn chain_table(len: usize, what: &'static str) -> Result<Vec<u32>> {
    let mut table = Vec::new();
    table
        .try_reserve_exact(len)
        .map_err(|_| Error::oom(what, len))?;
    table.resize(len, END_OF_CHAIN);
    Ok(table)
}

/// Finds earlier occurrences of the bytes at a position.
#[derive(Debug, Clone)]
pub struct MatchFinder<'a> {
    data: &'a [u8],
    max_same_length: usize,
    max_consecutive: usize,

    /// Next position to add to the chains.
    current_pos: usize,
    /// Position being matched.
    query_pos: usize,
    /// Next chain candidate for the query.
    match_pos: u32,
    longest_match: usize,
    consecutive: usize,
    same_length: usize,
    last_match: Vec<u32>,
    same_match: Vec<u32>,
}

impl<'a> MatchFinder<'a> {
    /// Create a match finder over `data`.
    ///
    /// # Arguments
    /// * `max_same_length` - Equal-length matches reported per position (>= 1)
    /// * `max_consecutive` - Distance-one matches kept in a byte run (>= 1)
    ///
    /// Fails with [`Error::OutOfMemory`] if the chain tables, one entry per
    /// input byte, cannot be allocated.
    pub fn new(data: &'a [u8], max_same_length: usize, max_consecutive: usize) -> Result<Self> {
        debug_assert!(max_same_length >= 1 && max_consecutive >= 1);
        Ok(Self {
            data,
            max_same_length,
            max_consecutive,
            current_pos: 0,
            query_pos: 0,
            match_pos: END_OF_CHAIN,
            longest_match: 0,
            consecutive: 0,
            same_length: 0,
            last_match: chain_table(HASH_SIZE, "match hash heads")?,
            same_match: chain_table(data.len(), "match chain links")?,
        })
    }

    /// Forget all chained positions.
    pub fn reset(&mut self) {
        self.last_match.fill(END_OF_CHAIN);
        self.same_match.fill(END_OF_CHAIN);
        self.current_pos = 0;
        self.query_pos = 0;
        self.match_pos = END_OF_CHAIN;
        self.longest_match = 0;
        self.consecutive = 0;
        self.same_length = 0;
    }

    /// Chain every position before `pos` and start matching at `pos`.
    ///
    /// Positions must be queried in non-decreasing order and `pos + 2` must
    /// not exceed the data length.
    pub fn begin_matching(&mut self, pos: usize) {
        assert!(pos >= self.current_pos, "match positions must not go backwards");
        assert!(pos + MIN_MATCH_LENGTH <= self.data.len());

        while self.current_pos < pos {
            let cp = self.current_pos;
            let hash = prefix(self.data, cp);
            let previous = self.last_match[hash];
            self.same_match[cp] = previous;
            if cp > 0 && previous as usize == cp - 1 {
                self.consecutive += 1;
                if self.consecutive >= self.max_consecutive {
                    // Splice the oldest kept neighbour over its predecessor.
                    let keep = cp - self.max_consecutive;
                    self.same_match[keep + 1] = self.same_match[keep];
                }
            } else {
                self.consecutive = 0;
            }
            self.last_match[hash] = cp as u32;
            self.current_pos += 1;
        }

        self.query_pos = pos;
        self.match_pos = self.last_match[prefix(self.data, pos)];
        self.longest_match = 0;
    }

    /// Report the next match as `(source position, length)`.
    ///
    /// Lengths are clipped to the end of the data.
    pub fn next_match(&mut self) -> Option<(usize, usize)> {
        let max_length = self.data.len() - self.query_pos;
        while self.match_pos != END_OF_CHAIN {
            let candidate = self.match_pos as usize;
            self.match_pos = self.same_match[candidate];

            let length = MIN_MATCH_LENGTH
                + self.data[candidate + MIN_MATCH_LENGTH..]
                    .iter()
                    .zip(&self.data[self.query_pos + MIN_MATCH_LENGTH..])
                    .take(max_length - MIN_MATCH_LENGTH)
                    .take_while(|(a, b)| a == b)
                    .count();

            if length >= self.longest_match {
                if length == self.longest_match {
                    self.same_length += 1;
                    if self.same_length >= self.max_same_length {
                        continue;
                    }
                } else {
                    self.same_length = 0;
                }
                self.longest_match = length;
                return Some((candidate, length));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_matches(finder: &mut MatchFinder, pos: usize) -> Vec<(usize, usize)> {
        finder.begin_matching(pos);
        std::iter::from_fn(|| finder.next_match()).collect()
    }

    #[test]
    fn test_simple_repeat() {
        let data = b"abcabcabc";
        let mut finder = MatchFinder::new(data, 20, 20).unwrap();
        assert!(all_matches(&mut finder, 1).is_empty());
        assert!(all_matches(&mut finder, 2).is_empty());
        assert_eq!(all_matches(&mut finder, 3), vec![(0, 6)]);
        assert_eq!(all_matches(&mut finder, 6), vec![(3, 3), (0, 3)]);
    }

    #[test]
    fn test_lengths_non_decreasing() {
        let data = b"abcd_abc_ab_abcd";
        let mut finder = MatchFinder::new(data, 100, 100).unwrap();
        let pos = 12;
        let matches = all_matches(&mut finder, pos);
        assert_eq!(matches, vec![(9, 2), (5, 3), (0, 4)]);
        for pair in matches.windows(2) {
            assert!(pair[0].0 > pair[1].0, "offsets must increase");
            assert!(pair[0].1 <= pair[1].1, "lengths must not decrease");
        }
        for &(src, len) in &matches {
            assert_eq!(&data[src..src + len], &data[pos..pos + len]);
        }
    }

    #[test]
    fn test_clipped_at_end() {
        let data = b"aaaaaaaaaa";
        let mut finder = MatchFinder::new(data, 20, 20).unwrap();
        let matches = all_matches(&mut finder, 1);
        assert_eq!(matches, vec![(0, 9)]);
    }

    #[test]
    fn test_same_length_cap() {
        let data = b"ab1ab2ab3ab4ab5ab";
        let mut finder = MatchFinder::new(data, 2, 20).unwrap();
        // Five earlier "ab" occurrences, all of length two.
        let matches = all_matches(&mut finder, 15);
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|&(_, len)| len == 2));
    }

    #[test]
    fn test_consecutive_cap_skips_run() {
        let data = vec![7u8; 64];
        let mut limited = MatchFinder::new(&data, 1000, 4).unwrap();
        let mut full = MatchFinder::new(&data, 1000, 1000).unwrap();
        let pos = 40;
        let limited_matches = all_matches(&mut limited, pos);
        let full_matches = all_matches(&mut full, pos);
        assert!(limited_matches.len() < full_matches.len());
        // The nearest match is always reported.
        assert_eq!(limited_matches[0].0, pos - 1);
    }

    #[test]
    fn test_distinct_bytes_never_match() {
        let data: Vec<u8> = (0..50).collect();
        let mut finder = MatchFinder::new(&data, 20, 20).unwrap();
        for pos in 1..data.len() - 1 {
            assert!(all_matches(&mut finder, pos).is_empty());
        }
    }

    #[test]
    fn test_reset_restarts() {
        let data = b"abab";
        let mut finder = MatchFinder::new(data, 20, 20).unwrap();
        assert_eq!(all_matches(&mut finder, 2), vec![(0, 2)]);
        finder.reset();
        assert_eq!(all_matches(&mut finder, 2), vec![(0, 2)]);
    }
}
