//! Reclamation: explicit free, bulk tag free and tag changes.
//!
//! Freeing a block clears its owner slot first, then merges it with a free
//! neighbour on either side, so no two free blocks are ever adjacent once
//! a call returns.

use tracing::{debug, trace};

use zonealloc_core::{Tag, ZoneError};

use crate::block::User;
use crate::handle::{BlockHandle, WeakBlock};
use crate::header;
use crate::zone::Zone;

impl Zone {
    /// Free a live block. Freeing a block twice, or a handle that does not
    /// name a block, is fatal.
    pub fn free(&mut self, handle: BlockHandle) {
        let idx = self.resolve_live("free", handle);
        self.free_block(idx);
    }

    /// Free the block behind an owner slot if it is still allocated.
    ///
    /// Returns `false` if the block was already reclaimed.
    pub fn free_weak(&mut self, weak: WeakBlock) -> bool {
        match self.owners.get(weak) {
            Some(idx) => {
                self.free_block(idx);
                true
            }
            None => false,
        }
    }

    /// Reclassify a live block.
    ///
    /// Promoting a cache block to a tag below the purge level protects it
    /// from eviction; demoting makes it evictable.
    pub fn change_tag(&mut self, handle: BlockHandle, tag: Tag) {
        let idx = self.resolve_live("change_tag", handle);
        if !tag.is_allocatable() {
            self.fatal("change_tag", ZoneError::InvalidTag { tag });
        }
        self.blocks.get_mut(idx).tag = tag;
    }

    /// Make a block permanent.
    pub fn change_tag_to_static(&mut self, handle: BlockHandle) {
        self.change_tag(handle, Tag::STATIC);
    }

    /// Make a block evictable.
    pub fn change_tag_to_cache(&mut self, handle: BlockHandle) {
        self.change_tag(handle, Tag::CACHE);
    }

    /// Free every occupied block whose tag lies in `[low, high]`.
    ///
    /// Returns the number of blocks freed.
    pub fn free_tags_in_range(&mut self, low: Tag, high: Tag) -> usize {
        let mut freed = 0;
        let mut cursor = self.blocks.first();
        while cursor != crate::block::SENTINEL {
            let rec = self.blocks.get(cursor);
            let mut next = rec.next;
            if !rec.is_free() && low <= rec.tag && rec.tag <= high {
                // The following block may be absorbed; continue after the
                // survivor instead.
                let survivor = self.free_block(cursor);
                next = self.blocks.get(survivor).next;
                freed += 1;
            }
            cursor = next;
        }
        debug!(%low, %high, freed, "freed tagged blocks");
        freed
    }

    /// Release everything scoped to the current level: tags from
    /// [`Tag::LEVEL`] up to just below the purge level.
    pub fn free_level_tags(&mut self) -> usize {
        let high = Tag(self.config.purge_level.0.saturating_sub(1));
        if high < Tag::LEVEL {
            return 0;
        }
        self.free_tags_in_range(Tag::LEVEL, high)
    }

    /// Return block `idx` to the free pool and merge it with free
    /// neighbours. Returns the index of the resulting free block.
    pub(crate) fn free_block(&mut self, idx: u32) -> u32 {
        if let Some(User::Weak(weak)) = self.blocks.get(idx).user {
            self.owners.remove(weak);
        }

        let rec = self.blocks.get_mut(idx);
        rec.user = None;
        rec.tag = Tag::FREE;
        let (offset, size, prev) = (rec.offset, rec.size, rec.prev);

        self.allocated_bytes -= size as usize;
        if self.config.instrumented {
            trace!(offset, size, running = self.allocated_bytes, "free");
        }

        let mut survivor = idx;
        if self.blocks.is_free(prev) {
            header::scrub(&mut self.memory, offset);
            self.blocks.absorb_next(prev);
            if self.rover == idx {
                self.rover = prev;
            }
            survivor = prev;
        }

        let next = self.blocks.get(survivor).next;
        if self.blocks.is_free(next) {
            header::scrub(&mut self.memory, self.blocks.get(next).offset);
            self.blocks.absorb_next(survivor);
            if self.rover == next {
                self.rover = survivor;
            }
        }

        let rec = self.blocks.get(survivor);
        let (offset, size) = (rec.offset, rec.size);
        header::write(&mut self.memory, offset, survivor, size);
        survivor
    }
}
