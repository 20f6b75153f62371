//! Point-in-time views of the block list.

use std::fmt;

use zonealloc_core::layout::HEADER_SIZE;
use zonealloc_core::Tag;

use crate::block::{BlockIter, User};
use crate::handle::{BlockHandle, WeakBlock};
use crate::zone::Zone;

/// Summary of zone occupancy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZoneStats {
    /// Arena size in bytes.
    pub arena_bytes: usize,
    /// Number of blocks, free and occupied.
    pub blocks: usize,
    /// Number of free blocks.
    pub free_blocks: usize,
    /// Bytes held by occupied blocks, headers included.
    pub used_bytes: usize,
    /// Bytes held by free blocks, headers included.
    pub free_bytes: usize,
    /// Largest free block in bytes, header included.
    pub largest_free: usize,
    /// Number of live owner slots.
    pub owners: usize,
}

impl fmt::Display for ZoneStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} B arena, {} blocks ({} free), {} B used, {} B free, largest free {} B",
            self.arena_bytes,
            self.blocks,
            self.free_blocks,
            self.used_bytes,
            self.free_bytes,
            self.largest_free
        )
    }
}

/// One block as seen by [`Zone::blocks`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Arena offset of the block header.
    pub offset: usize,
    /// Header plus payload, in bytes.
    pub size: usize,
    /// Purge tag ([`Tag::FREE`] for free blocks).
    pub tag: Tag,
    /// Whether the block is free.
    pub free: bool,
    /// Owner slot, if the block was allocated with one.
    pub owner: Option<WeakBlock>,
}

impl BlockInfo {
    /// Handle to this block's payload.
    pub fn handle(&self) -> BlockHandle {
        BlockHandle::from_header(self.offset as u32)
    }

    /// Payload capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.size - HEADER_SIZE
    }
}

/// Iterator returned by [`Zone::blocks`].
pub struct Blocks<'a> {
    inner: BlockIter<'a>,
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        let (_, rec) = self.inner.next()?;
        Some(BlockInfo {
            offset: rec.offset as usize,
            size: rec.size as usize,
            tag: rec.tag,
            free: rec.is_free(),
            owner: match rec.user {
                Some(User::Weak(w)) => Some(w),
                _ => None,
            },
        })
    }
}

impl Zone {
    /// Snapshot of zone occupancy.
    pub fn stats(&self) -> ZoneStats {
        let mut stats = ZoneStats {
            arena_bytes: self.arena_bytes(),
            owners: self.owners.live_count(),
            ..ZoneStats::default()
        };
        for (_, rec) in self.blocks.iter() {
            let size = rec.size as usize;
            stats.blocks += 1;
            if rec.is_free() {
                stats.free_blocks += 1;
                stats.free_bytes += size;
                stats.largest_free = stats.largest_free.max(size);
            } else {
                stats.used_bytes += size;
            }
        }
        stats
    }

    /// Walk the blocks in arena order.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            inner: self.blocks.iter(),
        }
    }
}
