//! In-arena block headers.
//!
//! The first paragraph of every block holds a small header inside the
//! arena itself:
//!
//! ```text
//! 0      2      4          8          12         16
//! +------+------+----------+----------+----------+
//! | id   | 0    | record   | size     | 0        |
//! +------+------+----------+----------+----------+
//! ```
//!
//! `id` is [`ZONE_ID`], `record` the index of the block's bookkeeping
//! record and `size` a copy of the block size. All fields little-endian.
//! A stray write past the end of a payload lands here and is caught by
//! the checker or the next free of the overwritten block.

use zonealloc_core::layout::HEADER_SIZE;
use zonealloc_core::ZONE_ID;

/// Decoded header fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Header {
    pub marker: u16,
    pub record: u32,
    pub size: u32,
}

pub(crate) fn write(memory: &mut [u8], offset: u32, record: u32, size: u32) {
    let h = &mut memory[offset as usize..offset as usize + HEADER_SIZE];
    h[0..2].copy_from_slice(&ZONE_ID.to_le_bytes());
    h[2..4].fill(0);
    h[4..8].copy_from_slice(&record.to_le_bytes());
    h[8..12].copy_from_slice(&size.to_le_bytes());
    h[12..16].fill(0);
}

pub(crate) fn read(memory: &[u8], offset: u32) -> Header {
    let h = &memory[offset as usize..offset as usize + HEADER_SIZE];
    Header {
        marker: u16::from_le_bytes([h[0], h[1]]),
        record: u32::from_le_bytes([h[4], h[5], h[6], h[7]]),
        size: u32::from_le_bytes([h[8], h[9], h[10], h[11]]),
    }
}

/// Wipe a header that has been absorbed into a neighbouring block.
pub(crate) fn scrub(memory: &mut [u8], offset: u32) {
    memory[offset as usize..offset as usize + HEADER_SIZE].fill(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let mut mem = vec![0xAAu8; 64];
        write(&mut mem, 16, 7, 48);
        let h = read(&mem, 16);
        assert_eq!(h.marker, ZONE_ID);
        assert_eq!(h.record, 7);
        assert_eq!(h.size, 48);
        // Neighbouring bytes untouched.
        assert_eq!(mem[15], 0xAA);
        assert_eq!(mem[32], 0xAA);
    }

    #[test]
    fn scrub_clears_marker() {
        let mut mem = vec![0u8; 32];
        write(&mut mem, 0, 1, 32);
        scrub(&mut mem, 0);
        assert_ne!(read(&mem, 0).marker, ZONE_ID);
    }
}
