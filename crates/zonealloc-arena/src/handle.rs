//! Block handles and weak owner handles.
//!
//! A [`BlockHandle`] is what the rest of the engine holds instead of a
//! pointer: the arena-relative offset of a block's payload. It carries no
//! liveness information; the zone validates it against the block header
//! on every use.
//!
//! A [`WeakBlock`] is an owner slot. The zone bumps the slot's generation
//! when the block is freed or evicted, so a stale `WeakBlock` upgrades to
//! `None` instead of dangling.

use std::fmt;

use zonealloc_core::layout::HEADER_SIZE;

/// Arena-relative payload offset of a live block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct BlockHandle {
    pub(crate) offset: u32,
}

impl BlockHandle {
    /// Handle for the block whose header starts at `header_offset`.
    pub(crate) fn from_header(header_offset: u32) -> Self {
        Self {
            offset: header_offset + HEADER_SIZE as u32,
        }
    }

    /// Build a handle from a raw payload offset.
    ///
    /// Nothing is checked here; the zone rejects offsets that do not name
    /// a live block when the handle is used.
    pub fn from_raw(offset: u32) -> Self {
        Self { offset }
    }

    /// Arena-relative offset of the first payload byte.
    pub fn offset(&self) -> usize {
        self.offset as usize
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHandle({:#x})", self.offset)
    }
}

/// Generation-checked owner slot for a block that may be reclaimed
/// without the holder's involvement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct WeakBlock {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl WeakBlock {
    pub(crate) fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Index of the owner slot.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Generation the slot had when this handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for WeakBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakBlock(slot={}, gen={})", self.slot, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_follows_header() {
        let h = BlockHandle::from_header(0x40);
        assert_eq!(h.offset(), 0x50);
    }

    #[test]
    fn raw_round_trip() {
        assert_eq!(BlockHandle::from_raw(0x1230).offset(), 0x1230);
    }

    #[test]
    fn weak_display() {
        let w = WeakBlock::new(3, 7);
        assert_eq!(w.to_string(), "WeakBlock(slot=3, gen=7)");
    }
}
