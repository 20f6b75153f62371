//! Allocation granularity and block header geometry.
//!
//! Every block in the zone starts on a paragraph boundary and spans a whole
//! number of paragraphs. The first paragraph of each block is its header.

/// Allocation granularity in bytes. All block sizes and offsets are
/// multiples of this value.
pub const PARAGRAPH_SIZE: usize = 16;

/// Bytes of header overhead carried by every block.
pub const HEADER_SIZE: usize = PARAGRAPH_SIZE;

/// Marker written at the start of every block header.
///
/// A block whose header does not start with this value has been
/// overwritten, or the handle used to reach it is not a block handle.
pub const ZONE_ID: u16 = 0x1dea;

/// Round `bytes` up to the next paragraph boundary.
///
/// Returns `None` on overflow.
pub fn paragraph_align_up(bytes: usize) -> Option<usize> {
    Some(bytes.checked_add(PARAGRAPH_SIZE - 1)? & !(PARAGRAPH_SIZE - 1))
}

/// Round `bytes` down to a paragraph boundary.
pub fn paragraph_align_down(bytes: usize) -> usize {
    bytes & !(PARAGRAPH_SIZE - 1)
}

/// Whether `offset` lies on a paragraph boundary.
pub fn is_paragraph_aligned(offset: usize) -> bool {
    offset & (PARAGRAPH_SIZE - 1) == 0
}

/// Total block size (header included) needed to hold `payload` bytes.
///
/// Returns `None` on overflow.
pub fn block_size_for(payload: usize) -> Option<usize> {
    paragraph_align_up(payload)?.checked_add(HEADER_SIZE)
}
