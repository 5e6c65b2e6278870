//! The allocator entry point and the crate's public façade.
//!
//! `Heap` ties [`crate::arena::Arena`], [`crate::bitmap::Bitmap`] and
//! [`crate::freelist::FreeList`] together behind the external contract: one
//! acquire-at-setup, one allocate-with-gc-retry, one release-at-cleanup.
use log::{debug, trace, warn};

use rust_alloc::boxed::Box;

use crate::arena::{Arena, BlockHandle, WordAddr};
use crate::bitmap::Bitmap;
use crate::collector;
use crate::error::HeapSetupError;
use crate::freelist::{self, FreeList};
use crate::header;
use crate::{OutOfMemoryHandler, PanicOnOom, RootSource, Tag};

/// The heap manager: one arena, one free-list registry, one mark bitmap
/// view over that same arena.
pub struct Heap {
    arena: Arena,
    free_list: FreeList,
    bitmap_start: WordAddr,
    heap_start: WordAddr,
    heap_start_set: bool,
    end: WordAddr,
    oom: Box<dyn OutOfMemoryHandler>,
}

impl Heap {
    /// Acquire a zero-initialized arena of `total_words` words, failing
    /// through [`PanicOnOom`] if the backing allocation can't be obtained.
    pub fn new(total_words: usize) -> Result<Self, HeapSetupError> {
        Self::with_oom_handler(total_words, PanicOnOom)
    }

    /// As [`Heap::new`], with a caller-supplied out-of-memory handler.
    pub fn with_oom_handler<H>(total_words: usize, handler: H) -> Result<Self, HeapSetupError>
    where
        H: OutOfMemoryHandler + 'static,
    {
        let arena = Arena::try_new(total_words)?;
        Ok(Self {
            end: WordAddr::from_index(total_words as u32),
            arena,
            free_list: FreeList::new(),
            bitmap_start: WordAddr::NONE,
            heap_start: WordAddr::NONE,
            heap_start_set: false,
            oom: Box::new(handler),
        })
    }

    /// The start of the arena (word index 0).
    pub fn start(&self) -> WordAddr {
        WordAddr::from_index(0)
    }

    /// One past the last word of the arena.
    pub fn end(&self) -> WordAddr {
        self.end
    }

    /// Partition `[p, end)` into a bitmap prefix and a heap suffix, and
    /// register the remainder as a single free block in its size class.
    ///
    /// # Panics
    /// Panics if called more than once: the code/bitmap/heap boundary is
    /// nominated exactly once per the external contract.
    pub fn set_heap_start(&mut self, p: u32) {
        assert!(!self.heap_start_set, "set_heap_start must only be called once");

        let partition = self.arena.partition(WordAddr::from_index(p));
        self.bitmap_start = partition.bitmap_start;
        self.heap_start = partition.heap_start;
        self.heap_start_set = true;

        self.free_list.init();
        let first_size = partition.heap_words - 1;
        let first = BlockHandle::new(self.heap_start.offset(1));
        self.arena.write(first.header_addr(), header::pack(Tag::None, first_size));
        let idx = freelist::class_of(first_size);
        self.free_list.prepend(&self.arena, idx, first);

        debug!(
            "gc: heap partitioned at {}, {} heap words, initial free block size {}",
            p, partition.heap_words, first_size
        );
    }

    /// Release the arena. Equivalent to dropping the `Heap`; kept as an
    /// explicit method since the external contract names `cleanup()` and a
    /// VM integrator may want to reclaim the words deterministically.
    pub fn cleanup(self) {}

    /// The payload size (in words) recorded in `block`'s header.
    pub fn block_size(&self, block: BlockHandle) -> u32 {
        header::unpack_size(self.arena.read(block.header_addr()))
    }

    /// The tag recorded in `block`'s header.
    pub fn block_tag(&self, block: BlockHandle) -> Tag {
        header::unpack_tag(self.arena.read(block.header_addr()))
    }

    /// Read payload word `index` of `block` (`0` is `block.addr()` itself).
    ///
    /// A block's payload belongs to its owner once allocated (invariant 5);
    /// this and [`Heap::write_word`] are how a VM integrator actually stores
    /// values into it, including encoded references to other blocks.
    pub fn read_word(&self, block: BlockHandle, index: u32) -> crate::Word {
        self.arena.read(block.addr().offset(index as i64))
    }

    /// Write payload word `index` of `block`. See [`Heap::read_word`].
    pub fn write_word(&self, block: BlockHandle, index: u32, value: crate::Word) {
        self.arena.write(block.addr().offset(index as i64), value);
    }

    /// A fixed, human-readable identity string for this collector.
    pub fn identity(&self) -> &'static str {
        "Mark and Sweep GC"
    }

    /// The current head of free-list class `idx`, if any.
    ///
    /// Exposed mainly so a caller (or a test) can inspect the registry's
    /// shape without reaching into crate-private fields.
    pub fn free_list_head(&self, idx: usize) -> Option<BlockHandle> {
        self.free_list.head(idx)
    }

    /// Walk every block in the heap region in address order, in one linear
    /// pass, yielding each block's handle, tag and recorded size.
    pub fn blocks(&self) -> BlockIter<'_> {
        BlockIter {
            arena: &self.arena,
            current: self.heap_start.offset(1),
            end: self.end,
        }
    }

    /// Force a mark-and-sweep collection from `roots`.
    pub fn collect(&mut self, roots: &dyn RootSource) {
        let bitmap = Bitmap::new(&self.arena, self.bitmap_start, self.heap_start);
        collector::collect(&self.arena, &bitmap, &mut self.free_list, self.heap_start, self.end, roots.roots());
    }

    /// Allocate a block tagged `tag` with `size` payload words.
    ///
    /// Never returns a "null" value: if the first-fit search fails, this
    /// forces a collection using `roots` and retries exactly once before
    /// invoking the configured [`OutOfMemoryHandler`].
    ///
    /// # Panics
    /// Panics if called before [`Heap::set_heap_start`].
    pub fn allocate(&mut self, tag: Tag, size: u32, roots: &dyn RootSource) -> BlockHandle {
        assert!(self.heap_start_set, "allocate called before set_heap_start");

        let normalized = size.max(1);

        if let Some(block) = self.try_allocate(tag, size, normalized) {
            return block;
        }

        debug!("gc: first-fit search failed for {normalized} words, forcing collection");
        self.collect(roots);

        if let Some(block) = self.try_allocate(tag, size, normalized) {
            return block;
        }

        warn!("gc: out of memory for {size} words after collection");
        self.oom.fail(size)
    }

    /// One first-fit pass over the registry, starting at `class_of(normalized)`.
    fn try_allocate(&mut self, tag: Tag, size: u32, normalized: u32) -> Option<BlockHandle> {
        for idx in freelist::class_of(normalized)..freelist::CLASSES {
            let mut prev: Option<BlockHandle> = None;
            let mut current = self.free_list.head(idx);

            while let Some(block) = current {
                let block_size = header::unpack_size(self.arena.read(block.header_addr()));
                if block_size >= normalized {
                    match prev {
                        None => self.free_list.pop_head(&self.arena, idx),
                        Some(p) => self.free_list.remove_next(&self.arena, p),
                    }
                    return Some(self.finish_allocate(tag, size, normalized, block, block_size));
                }
                prev = Some(block);
                current = self.free_list.next(&self.arena, block);
            }
        }
        None
    }

    /// Split `block` (if there's a usable remainder), publish it, mark the
    /// allocated block, and stamp its header.
    fn finish_allocate(&mut self, tag: Tag, original_size: u32, normalized: u32, block: BlockHandle, total_size: u32) -> BlockHandle {
        if total_size > normalized {
            let remainder = total_size - normalized - 1;
            let new_free_addr = block.addr().offset(normalized as i64 + 1);
            self.arena.write(new_free_addr.offset(-1), header::pack(Tag::None, remainder));
            if remainder > 0 {
                let new_free = BlockHandle::new(new_free_addr);
                let idx = freelist::class_of(remainder);
                self.free_list.prepend(&self.arena, idx, new_free);
                trace!("gc: split block of {total_size} into {normalized} + {remainder} words");
            } else {
                trace!("gc: split left a zero-payload remainder after {normalized} words");
            }
        }

        let bitmap = Bitmap::new(&self.arena, self.bitmap_start, self.heap_start);
        bitmap.set(block);
        self.arena.write(block.header_addr(), header::pack(tag, original_size));
        self.arena.write(block.addr(), 0);
        block
    }
}

/// Iterates every block in a [`Heap`]'s heap region, in address order.
pub struct BlockIter<'a> {
    arena: &'a Arena,
    current: WordAddr,
    end: WordAddr,
}

impl<'a> Iterator for BlockIter<'a> {
    type Item = (BlockHandle, Tag, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.end {
            return None;
        }
        let block = BlockHandle::new(self.current);
        let (tag, size) = header::unpack(self.arena.read(block.header_addr()));
        // a `None` block's footprint is exactly `size + 1` words, same as the
        // sweep's own walk (collector.rs): a zero-remainder split leaves a
        // header-only free block with no reserved payload word, unlike a
        // live zero-size allocation (which reserves one).
        let step = if tag == Tag::None { size } else { size.max(1) };
        self.current = self.current.offset(step as i64 + 1);
        Some((block, tag, size))
    }
}
