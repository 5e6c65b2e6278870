//! Error types for the two recoverable failure kinds named in §7: arena
//! acquisition failure at setup, and a header byte that doesn't decode to a
//! known [`crate::Tag`] at a system boundary. Every other failure mode
//! (double setup, allocate before `set_heap_start`, heap exhaustion after a
//! forced collection) is either a contract violation (`assert!`) or routed
//! through the non-returning [`crate::OutOfMemoryHandler`] hook; neither
//! needs a `Result` type.
use core::fmt;

/// The arena's backing allocation could not be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapSetupError {
    /// `try_reserve` failed for the requested word count.
    OutOfMemory { total_words: usize },
}

impl fmt::Display for HeapSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapSetupError::OutOfMemory { total_words } => {
                write!(f, "cannot allocate {total_words} words of memory")
            }
        }
    }
}

/// A raw byte did not correspond to a known [`crate::Tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTag(pub u8);

impl fmt::Display for InvalidTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid block tag byte: {:#04x}", self.0)
    }
}
