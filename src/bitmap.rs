//! The mark bitmap: one bit per heap word.
//!
//! **Polarity note** (see spec §4.3 and §9): a set bit means "candidate for
//! collection this cycle", not classical "reached". `set` is invoked at
//! allocation time; the marker clears a bit the first time it visits a
//! reachable block (which doubles as the "already visited this cycle"
//! guard); the sweep reclaims anything still set. Do not "normalize" this to
//! classical set-on-mark without auditing every call site listed above —
//! the whole point is to avoid a bulk bitmap clear at the start of each GC
//! cycle.
use crate::arena::{Arena, BlockHandle, WordAddr};
use crate::Word;

/// A view over the bitmap region of an [`Arena`].
///
/// Addressing uses `(block - heap_start)`: the bit for a block is the bit
/// for its first payload word, never its header. Bits for words that are
/// not starts of blocks are unused and ignored.
pub struct Bitmap<'a> {
    arena: &'a Arena,
    bitmap_start: WordAddr,
    heap_start: WordAddr,
}

impl<'a> Bitmap<'a> {
    pub fn new(arena: &'a Arena, bitmap_start: WordAddr, heap_start: WordAddr) -> Self {
        Self {
            arena,
            bitmap_start,
            heap_start,
        }
    }

    fn locate(&self, block: BlockHandle) -> (WordAddr, Word) {
        let bit_index = block.addr().index() - self.heap_start.index();
        let word_index = bit_index / Word::BITS;
        let mask = 1 << (bit_index % Word::BITS);
        (self.bitmap_start.offset(word_index as i64), mask)
    }

    /// Mark `block` as a candidate for collection this cycle.
    pub fn set(&self, block: BlockHandle) {
        let (word, mask) = self.locate(block);
        let current = self.arena.read(word);
        self.arena.write(word, current | mask);
    }

    /// Clear `block`'s bit: "reached" during mark, or "reclaimed" during sweep.
    pub fn clear(&self, block: BlockHandle) {
        let (word, mask) = self.locate(block);
        let current = self.arena.read(word);
        self.arena.write(word, current & !mask);
    }

    /// `true` if `block` is still a candidate for collection this cycle.
    pub fn is_set(&self, block: BlockHandle) -> bool {
        let (word, mask) = self.locate(block);
        self.arena.read(word) & mask != 0
    }
}
