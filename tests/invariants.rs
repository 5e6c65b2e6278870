//! Quantified invariants the heap manager must hold across allocation and
//! collection sequences, independent of the six worked scenarios.
use std::collections::HashSet;

use tagged_heap::{freelist, BlockHandle, Heap, RootSource, Tag, WordAddr};

struct Roots {
    ib: Option<BlockHandle>,
    lb: Option<BlockHandle>,
    ob: Option<BlockHandle>,
}

impl Roots {
    fn none() -> Self {
        Roots {
            ib: None,
            lb: None,
            ob: None,
        }
    }

    fn one(handle: BlockHandle) -> Self {
        Roots {
            ib: Some(handle),
            lb: None,
            ob: None,
        }
    }
}

impl RootSource for Roots {
    fn roots(&self) -> [Option<BlockHandle>; 3] {
        [self.ib, self.lb, self.ob]
    }
}

/// Tiling: walking blocks from the first heap word in address order lands
/// exactly on `heap.end()`, with no gaps and no overlap.
#[test]
fn tiling_holds_after_allocations_and_a_collection() {
    let mut heap = Heap::new(1024).unwrap();
    heap.set_heap_start(8);
    let roots = Roots::none();
    let a = heap.allocate(Tag::String, 7, &roots);
    let _b = heap.allocate(Tag::Function, 3, &roots);
    let _c = heap.allocate(Tag::RegisterFrame, 0, &roots);
    heap.collect(&Roots::one(a));

    let mut cursor = WordAddr::from_index(0);
    for (block, tag, size) in heap.blocks() {
        if cursor != WordAddr::from_index(0) {
            assert_eq!(block.header_addr(), cursor, "block did not start where the previous one ended");
        }
        let step = if tag == Tag::None { size } else { size.max(1) };
        cursor = block.addr().offset(step as i64);
    }
    assert_eq!(cursor, heap.end());
}

/// Free-list soundness: every free block seen by a linear walk is also
/// reachable from its size class's head, and no block appears twice.
#[test]
fn free_list_soundness_after_allocations() {
    let mut heap = Heap::new(512).unwrap();
    heap.set_heap_start(0);
    let roots = Roots::none();
    let _a = heap.allocate(Tag::String, 4, &roots);
    let _b = heap.allocate(Tag::String, 4, &roots);

    let mut seen = Vec::new();
    for (block, tag, size) in heap.blocks() {
        if tag == Tag::None {
            let idx = freelist::class_of(size.max(1));
            assert!(heap.free_list_head(idx).is_some(), "class {idx} has a free block but no head");
            seen.push(block.addr().index());
        }
    }

    let unique: HashSet<_> = seen.iter().copied().collect();
    assert_eq!(unique.len(), seen.len(), "a free block was counted twice");
}

/// No two `None`-tagged blocks are ever adjacent once a sweep has run.
#[test]
fn no_adjacent_free_blocks_after_sweep() {
    let mut heap = Heap::new(256).unwrap();
    heap.set_heap_start(0);
    let roots = Roots::none();
    let a = heap.allocate(Tag::String, 3, &roots);
    let _b = heap.allocate(Tag::String, 3, &roots);
    let _c = heap.allocate(Tag::String, 3, &roots);
    heap.collect(&Roots::one(a));

    let mut previous_was_free = false;
    for (_, tag, _) in heap.blocks() {
        let is_free = tag == Tag::None;
        assert!(!(is_free && previous_was_free), "two adjacent free blocks after sweep");
        previous_was_free = is_free;
    }
}

/// Allocate-zero: a zero-word request returns a distinct one-word payload
/// with header-size zero.
#[test]
fn allocate_zero_yields_distinct_one_word_blocks() {
    let mut heap = Heap::new(256).unwrap();
    heap.set_heap_start(0);
    let roots = Roots::none();
    let a = heap.allocate(Tag::String, 0, &roots);
    let b = heap.allocate(Tag::String, 0, &roots);

    assert_eq!(heap.block_size(a), 0);
    assert_eq!(heap.block_size(b), 0);
    assert_ne!(a.addr().index(), b.addr().index());
    assert_eq!(b.addr().index() - a.addr().index(), 2, "each zero-size block still costs 1 header + 1 payload word");
}

/// GC idempotence: with no root changes, a second forced collection is a
/// no-op on the heap's observable layout.
#[test]
fn gc_is_idempotent_on_steady_state() {
    let mut heap = Heap::new(512).unwrap();
    heap.set_heap_start(0);
    let roots = Roots::none();
    let a = heap.allocate(Tag::String, 5, &roots);
    let _b = heap.allocate(Tag::String, 5, &roots);

    let live_roots = Roots::one(a);
    heap.collect(&live_roots);
    let after_first: Vec<_> = heap.blocks().collect();
    heap.collect(&live_roots);
    let after_second: Vec<_> = heap.blocks().collect();

    assert_eq!(after_first, after_second);
}
