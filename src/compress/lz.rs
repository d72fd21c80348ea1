//! LZ symbol layout on top of a [`Coder`].
//!
//! A stream is a sequence of symbols, each either a literal byte or a
//! reference `(offset, length)` copying earlier output:
//!
//! - The first symbol is always a literal and has no kind flag.
//! - Every later symbol starts with a kind flag, 0 for literal, 1 for
//!   reference.
//! - A literal codes its 8 bits MSB first through a binary context tree.
//! - A reference that follows a literal codes a "repeated" flag telling
//!   whether it reuses the previous reference's offset. If not, the offset
//!   follows as the number `offset + 2`. The length follows as a number.
//! - The stream ends with a reference to offset 0.
//!
//! Kind flags and literal bits use one of two context groups selected by
//! the parity of the output position, which helps data with 16-bit
//! structure.

use crate::coder::Coder;

/// Context of the "repeated offset" flag.
pub const CONTEXT_REPEATED: usize = 0;

/// Contexts per group.
const GROUP_SIZE: usize = 256;

/// Literal groups: one per position parity.
const GROUP_LITERAL: usize = 0;
const GROUP_OFFSET: usize = 2;
const GROUP_LENGTH: usize = 3;
const NUM_GROUPS: usize = 4;

/// Slot of the kind flag inside a literal group.
const CONTEXT_KIND: usize = 0;

/// Total number of contexts used by the LZ layer.
pub const NUM_CONTEXTS: usize = 1 + NUM_GROUPS * GROUP_SIZE;

/// Offset number marking the end of the stream.
pub const END_OF_STREAM: u32 = 2;

#[inline]
pub(crate) const fn group_base(group: usize) -> usize {
    1 + group * GROUP_SIZE
}

#[inline]
pub(crate) const fn literal_base(parity: usize) -> usize {
    group_base(GROUP_LITERAL + parity)
}

#[inline]
pub(crate) const fn kind_context(parity: usize) -> usize {
    literal_base(parity) + CONTEXT_KIND
}

/// Base context for offset numbers.
pub(crate) const OFFSET_BASE: usize = group_base(GROUP_OFFSET);

/// Base context for length numbers.
pub(crate) const LENGTH_BASE: usize = group_base(GROUP_LENGTH);

/// Coding state between symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LzState {
    /// Output position.
    pub pos: usize,
    /// Whether the previous symbol was a reference.
    pub prev_was_ref: bool,
    /// Offset of the most recent reference, 0 before the first.
    pub last_offset: u32,
}

/// Drives a [`Coder`] with LZ symbols.
#[derive(Debug)]
pub struct LzEncoder<C> {
    coder: C,
    parity_mask: usize,
}

impl<C: Coder> LzEncoder<C> {
    /// # Arguments
    /// * `coder` - Receives the coded bits
    /// * `parity_context` - Select literal contexts by position parity
    pub fn new(coder: C, parity_context: bool) -> Self {
        Self {
            coder,
            parity_mask: usize::from(parity_context),
        }
    }

    /// State before the first symbol.
    pub fn initial_state(&self) -> LzState {
        LzState::default()
    }

    /// State at `pos` given how the parse arrived there.
    pub fn state_at(&self, pos: usize, prev_was_ref: bool, last_offset: u32) -> LzState {
        LzState {
            pos,
            prev_was_ref,
            last_offset,
        }
    }

    #[inline]
    fn parity(&self, state: &LzState) -> usize {
        state.pos & self.parity_mask
    }

    /// Code one literal byte at `state`, advancing it.
    pub fn encode_literal(&mut self, state: &mut LzState, value: u8) -> u64 {
        let parity = self.parity(state);
        let mut size = 0;
        if state.pos > 0 {
            size += self.coder.code(kind_context(parity), false);
        }
        let base = literal_base(parity);
        let mut context = 1;
        for i in (0..8).rev() {
            let bit = (value >> i) & 1 != 0;
            size += self.coder.code(base + context, bit);
            context = (context << 1) | usize::from(bit);
        }
        state.pos += 1;
        state.prev_was_ref = false;
        size
    }

    /// Code a reference at `state`, advancing it past the copied bytes.
    ///
    /// Directly after a reference, `offset` must differ from the last one.
    pub fn encode_reference(&mut self, state: &mut LzState, offset: u32, length: u32) -> u64 {
        debug_assert!(offset >= 1 && length >= 2);
        debug_assert!(state.pos > 0, "a stream cannot start with a reference");
        debug_assert!(
            !(state.prev_was_ref && offset == state.last_offset),
            "consecutive references cannot share an offset"
        );
        let parity = self.parity(state);
        let mut size = self.coder.code(kind_context(parity), true);
        let repeated = offset == state.last_offset;
        if !state.prev_was_ref {
            size += self.coder.code(CONTEXT_REPEATED, repeated);
        }
        if !repeated {
            size += self.coder.encode_number(OFFSET_BASE, offset + 2);
        }
        size += self.coder.encode_number(LENGTH_BASE, length);

        state.pos += length as usize;
        state.prev_was_ref = true;
        state.last_offset = offset;
        size
    }

    /// Code the end-of-stream marker.
    pub fn finish(&mut self, state: &LzState) -> u64 {
        let parity = self.parity(state);
        let mut size = self.coder.code(kind_context(parity), true);
        if !state.prev_was_ref {
            size += self.coder.code(CONTEXT_REPEATED, false);
        }
        size + self.coder.encode_number(OFFSET_BASE, END_OF_STREAM)
    }

    /// Give back the wrapped coder.
    pub fn into_inner(self) -> C {
        self.coder
    }
}
