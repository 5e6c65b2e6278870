//! Packing and unpacking of block header words.
//!
//! A header word packs a [`Tag`] into its low 8 bits and a word count into
//! the remaining high bits: `(size << 8) | tag`. See [`crate::Tag`] for the
//! set of valid tags.
use crate::{Tag, Word};

/// Number of header bits reserved for the size field.
pub const SIZE_BITS: u32 = Word::BITS - 8;
/// Largest payload size (in words) representable in a header.
pub const MAX_SIZE: u32 = (1 << SIZE_BITS) - 1;

/// Pack a `(tag, size)` pair into a single header word.
///
/// No overflow check is performed: callers must not request a `size` beyond
/// [`MAX_SIZE`] (the spec places that burden on the caller, not the codec).
pub const fn pack(tag: Tag, size: u32) -> Word {
    (size << 8) | (tag as Word)
}

/// Unpack a header word into its tag and size.
///
/// # Panics
/// Panics (via [`Tag::from_raw`]) if the low byte is not one of the known
/// tag values. Every header this crate writes was produced by [`pack`], so
/// this can only fail if the arena was corrupted by code outside this
/// crate's control, which is a contract violation rather than a recoverable
/// condition.
pub fn unpack(header: Word) -> (Tag, u32) {
    let tag = Tag::from_raw((header & 0xFF) as u8)
        .expect("corrupt block header: low byte is not a valid tag");
    let size = header >> 8;
    (tag, size)
}

/// Unpack only the tag from a header word, same panic behavior as [`unpack`].
pub fn unpack_tag(header: Word) -> Tag {
    Tag::from_raw((header & 0xFF) as u8).expect("corrupt block header: low byte is not a valid tag")
}

/// Unpack only the size from a header word.
pub const fn unpack_size(header: Word) -> u32 {
    header >> 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_tags() {
        for tag in [Tag::String, Tag::RegisterFrame, Tag::Function, Tag::None] {
            for size in [0, 1, 2, 17, MAX_SIZE] {
                let packed = pack(tag, size);
                assert_eq!(unpack(packed), (tag, size));
            }
        }
    }

    #[test]
    fn size_field_width() {
        assert_eq!(SIZE_BITS, 24);
        assert_eq!(MAX_SIZE, (1 << 24) - 1);
    }

    #[test]
    fn tag_occupies_low_byte() {
        let packed = pack(Tag::Function, 5);
        assert_eq!(packed & 0xFF, Tag::Function as Word);
        assert_eq!(packed >> 8, 5);
    }
}
