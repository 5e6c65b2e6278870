//! Word-addressed heap manager with mark-and-sweep garbage collection.
//!
//! This crate owns one contiguous region of [`Word`]s on behalf of a small
//! bytecode VM. Callers allocate tagged blocks — strings, register frames,
//! function closures — and reference them through word-sized encoded
//! values; when allocation can't be satisfied from the free-list registry,
//! the heap marks from three VM-held roots and sweeps the arena to reclaim
//! whatever wasn't reached.
//!
//! # Usage
//! A VM integrator owns a [`Heap`] alongside its own root fields, nominates
//! the heap/code-area boundary once, and hands a small [`RootSource`]
//! snapshot to `allocate`/`collect` so a forced collection can see the
//! current roots without the heap needing to own the VM that owns it:
//! ```no_run
//! use tagged_heap::{Heap, Tag, BlockHandle, RootSource};
//!
//! struct Roots {
//!     ib: Option<BlockHandle>,
//!     lb: Option<BlockHandle>,
//!     ob: Option<BlockHandle>,
//! }
//! impl RootSource for Roots {
//!     fn roots(&self) -> [Option<BlockHandle>; 3] {
//!         [self.ib, self.lb, self.ob]
//!     }
//! }
//!
//! let mut heap = Heap::new(4096).unwrap();
//! heap.set_heap_start(16);
//! let roots = Roots { ib: None, lb: None, ob: None };
//! let s = heap.allocate(Tag::String, 10, &roots);
//! assert_eq!(heap.block_size(s), 10);
//! ```
//!
//! # Walking through a small example
//! 1. `Heap::new(4096)` acquires a zero-initialized 4096-word arena.
//! 2. `set_heap_start(16)` reserves words `[0, 16)` for the caller's code
//!    area, sizes a mark bitmap for the rest, and leaves the remaining
//!    words as one free block in the last size class.
//! 3. `allocate(Tag::String, 10)` carves an 11-word (header + 10) prefix off
//!    that free block and republishes the remainder.
//! 4. If a later `allocate` can't find a big-enough free block, the heap
//!    marks from the VM's three roots, sweeps the arena (reclaiming and
//!    coalescing as it goes), and retries the search exactly once before
//!    calling the configured [`OutOfMemoryHandler`].
//!
//! See the crate's `tests/` directory for the complete split/coalesce/
//! reachability scenarios this walkthrough is drawn from.
#![no_std]

extern crate alloc as rust_alloc;

use core::fmt;

pub mod arena;
pub mod bitmap;
pub mod collector;
pub mod error;
pub mod freelist;
pub mod header;
mod heap;

pub use arena::{BlockHandle, WordAddr};
pub use error::{HeapSetupError, InvalidTag};
pub use heap::Heap;

/// The fundamental unit of storage: a fixed-width unsigned integer.
///
/// Every size, address and header in this crate is expressed in `Word`s.
/// Changing the reference platform's word width is a one-line edit here;
/// [`header::SIZE_BITS`] and [`header::MAX_SIZE`] derive from it.
pub type Word = u32;

/// The tag stored in a block header's low byte.
///
/// `None` marks a free block; every other variant marks a live block and
/// identifies what the VM is using it for.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    String = 200,
    RegisterFrame = 201,
    Function = 202,
    /// Marks a free block. Never returned to a caller.
    None = 255,
}

impl Tag {
    /// Decode a raw header byte, or `None` if it isn't one of the four
    /// known values.
    pub const fn from_raw(raw: u8) -> Option<Tag> {
        match raw {
            200 => Some(Tag::String),
            201 => Some(Tag::RegisterFrame),
            202 => Some(Tag::Function),
            255 => Some(Tag::None),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Tag {
    type Error = InvalidTag;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Tag::from_raw(raw).ok_or(InvalidTag(raw))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tag::String => "String",
            Tag::RegisterFrame => "RegisterFrame",
            Tag::Function => "Function",
            Tag::None => "None",
        };
        f.write_str(name)
    }
}

/// Supplies the three VM-held roots (`Ib`, `Lb`, `Ob`) a collection marks
/// from. Implemented once by the VM integrator.
///
/// Root values are read exactly once, at the start of `collect`/`mark`, and
/// must not change for the duration of that call — the same contract the
/// three C accessor functions carried in the reference implementation.
pub trait RootSource {
    fn roots(&self) -> [Option<BlockHandle>; 3];
}

/// Handles the one unrecoverable failure this crate can reach at runtime:
/// a request that still can't be satisfied after a forced collection.
///
/// `fail` must not return; the `-> !` signature makes that a compile-time
/// guarantee rather than a documented convention.
pub trait OutOfMemoryHandler {
    fn fail(&self, requested_words: u32) -> !;
}

/// Formats `"cannot allocate N bytes of memory"` and panics.
///
/// `N` is `requested_words`, the original requested size in words: the
/// reference implementation's message is byte-labeled but passes its word
/// count straight into the format string unconverted, and this keeps the
/// same (mislabeled) number rather than actually converting to bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicOnOom;

impl OutOfMemoryHandler for PanicOnOom {
    fn fail(&self, requested_words: u32) -> ! {
        panic!("cannot allocate {requested_words} bytes of memory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrips_through_try_from() {
        for raw in [200u8, 201, 202, 255] {
            let tag = Tag::try_from(raw).unwrap();
            assert_eq!(tag as u8, raw);
        }
    }

    #[test]
    fn tag_rejects_unknown_byte() {
        assert_eq!(Tag::try_from(7), Err(InvalidTag(7)));
    }
}
