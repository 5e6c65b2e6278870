//! Recursive precise mark and the linear sweep-and-coalesce pass.
//!
//! Grounded directly on `rec_mark`/`sweep`/`coalesce` in the reference
//! implementation. Two deliberate deviations from that reference, both
//! recorded in `DESIGN.md`:
//!
//! - the mark recursion's upper bound is `addr < end` rather than
//!   `addr <= end`, since the inclusive form can walk one word into
//!   whatever follows the arena;
//! - the sweep never classifies a zero-payload `None` block into the free
//!   list, since such a block has no payload word available to double as an
//!   intrusive link; it is left in place for a neighboring run to absorb on
//!   a later pass, exactly as the allocator already declines to register a
//!   zero-remainder split (see [`crate::heap`]).
use crate::arena::{Arena, BlockHandle, WordAddr};
use crate::bitmap::Bitmap;
use crate::freelist::{self, FreeList};
use crate::header;
use crate::Tag;

/// A block's real word footprint: a header-recorded size of zero still
/// consumes one payload word in practice (callers requesting zero words get
/// a one-word block), so anywhere the sweep needs to know how much space a
/// block actually occupies, it must use this rather than the raw header
/// size.
fn real_size(size: u32) -> u32 {
    if size == 0 {
        1
    } else {
        size
    }
}

/// Depth-first mark starting from `root`, within `(heap_start, end)`.
///
/// `root` is a candidate heap pointer exactly when `root.index() != 0` and
/// `root.index() & 3 == 0` (checked by the caller via [`is_candidate`]).
/// Recursion bottoms out on a block whose bit is already clear: either it
/// was reached earlier in this same cycle, or it sits outside the heap
/// region and must not be touched.
pub fn mark_from(arena: &Arena, bitmap: &Bitmap, heap_start: WordAddr, end: WordAddr, root: BlockHandle) {
    let addr = root.addr();
    if addr <= heap_start || addr >= end {
        return;
    }
    if !bitmap.is_set(root) {
        return;
    }
    bitmap.clear(root);

    let size = header::unpack_size(arena.read(root.header_addr()));
    for i in 0..size {
        let word = arena.read(addr.offset(i as i64));
        if is_candidate(word) {
            mark_from(arena, bitmap, heap_start, end, BlockHandle::new(WordAddr::from_index(word)));
        }
    }
}

/// `true` if `word` could be an encoded block address rather than an
/// ordinary tagged value: nonzero, and its low two bits clear.
pub fn is_candidate(word: u32) -> bool {
    word != 0 && word & 3 == 0
}

/// Mark every block reachable from `roots`, then reclaim and coalesce
/// everything left unmarked, rebuilding `free_list` from scratch.
///
/// `roots` is a fixed-size array rather than a slice to mirror the three
/// named VM roots (`Ib`, `Lb`, `Ob`) the spec enumerates; a `None` entry
/// means that root currently holds a non-pointer value.
pub fn collect(
    arena: &Arena,
    bitmap: &Bitmap,
    free_list: &mut FreeList,
    heap_start: WordAddr,
    end: WordAddr,
    roots: [Option<BlockHandle>; 3],
) {
    for root in roots.into_iter().flatten() {
        mark_from(arena, bitmap, heap_start, end, root);
    }
    sweep(arena, bitmap, free_list, heap_start, end);
}

/// Linear sweep over `[heap_start, end)`: reclaims every block still marked
/// as a candidate, coalesces adjacent free runs, and rebuilds `free_list`.
fn sweep(arena: &Arena, bitmap: &Bitmap, free_list: &mut FreeList, heap_start: WordAddr, end: WordAddr) {
    free_list.init();

    let mut start_free = heap_start.offset(1);
    let mut current = start_free;
    let mut last_class: Option<usize> = None;

    while current < end {
        let mut size = header::unpack_size(arena.read(current.header_addr()));
        let block = BlockHandle::new(current);

        if bitmap.is_set(block) {
            bitmap.clear(block);
            size = real_size(size);
            arena.zero(current, size);
            arena.write(current.header_addr(), header::pack(Tag::None, size));
        }

        if header::unpack_tag(arena.read(current.header_addr())) == Tag::None {
            if start_free < current {
                arena.write(current.header_addr(), 0);
                if size > 0 {
                    arena.write(current, 0);
                }
                let merged = (current.index() - start_free.index()) + size;
                arena.write(start_free.header_addr(), header::pack(Tag::None, merged));
                current = start_free;
                size = merged;
            }

            if size == 0 {
                // No payload word to link with; leave it for a neighbor to
                // absorb and make sure we don't pop an unrelated class below.
                last_class = None;
            } else {
                let idx = freelist::class_of(size);
                if Some(idx) != last_class {
                    if let Some(prev) = last_class {
                        free_list.pop_head(arena, prev);
                    }
                    free_list.prepend(arena, idx, BlockHandle::new(current));
                    last_class = Some(idx);
                }
            }
        } else {
            size = real_size(size);
            start_free = current.offset(size as i64 + 1);
            bitmap.set(BlockHandle::new(current));
            last_class = None;
        }

        current = current.offset(size as i64 + 1);
    }
}
