//! Next-fit allocation with eviction of purgeable blocks.
//!
//! The scan starts at the rover (stepping back one block first if the
//! block behind it is free) and walks the circular list for at most one
//! lap. `base` marks the start of the run being considered:
//!
//! - an occupied block below the purge level cannot be used, so `base`
//!   moves past it;
//! - an occupied purgeable block is freed on the spot, which merges it
//!   into the run;
//! - a free block simply extends the run (it can only be followed by an
//!   occupied block, so the run is at most one free block long).
//!
//! Eviction order is list order from wherever the rover happens to be,
//! not recency of use.

use tracing::{debug, trace};

use zonealloc_core::layout::block_size_for;
use zonealloc_core::{Tag, ZoneError};

use crate::block::{User, SENTINEL};
use crate::handle::{BlockHandle, WeakBlock};
use crate::header;
use crate::zone::Zone;

impl Zone {
    /// Allocate at least `size` payload bytes with `tag` and no owner.
    ///
    /// Returns `None` if no block can be found, even after evicting every
    /// purgeable block met during one lap of the list. A block allocated
    /// with a purgeable tag and no owner can vanish without notice; use
    /// [`try_allocate_weak`](Zone::try_allocate_weak) for those.
    pub fn try_allocate(&mut self, size: usize, tag: Tag) -> Option<BlockHandle> {
        let (idx, _) = self.try_malloc("try_allocate", size, tag, false)?;
        Some(self.handle_of(idx))
    }

    /// Allocate at least `size` payload bytes with `tag` and an owner slot.
    ///
    /// The returned [`WeakBlock`] stops resolving as soon as the block is
    /// freed, evicted or released by a bulk tag free.
    pub fn try_allocate_weak(&mut self, size: usize, tag: Tag) -> Option<WeakBlock> {
        let (_, weak) = self.try_malloc("try_allocate_weak", size, tag, true)?;
        weak
    }

    /// Like [`try_allocate`](Zone::try_allocate), but exhaustion is fatal.
    pub fn allocate(&mut self, size: usize, tag: Tag) -> BlockHandle {
        match self.try_malloc("allocate", size, tag, false) {
            Some((idx, _)) => self.handle_of(idx),
            None => self.out_of_memory("allocate", size),
        }
    }

    /// Like [`try_allocate_weak`](Zone::try_allocate_weak), but exhaustion
    /// is fatal.
    pub fn allocate_weak(&mut self, size: usize, tag: Tag) -> WeakBlock {
        match self.try_malloc("allocate_weak", size, tag, true) {
            Some((_, Some(weak))) => weak,
            _ => self.out_of_memory("allocate_weak", size),
        }
    }

    /// Static allocation that may fail.
    pub fn try_allocate_static(&mut self, size: usize) -> Option<BlockHandle> {
        self.try_allocate(size, Tag::STATIC)
    }

    /// Static allocation, fatal on exhaustion.
    pub fn allocate_static(&mut self, size: usize) -> BlockHandle {
        self.allocate(size, Tag::STATIC)
    }

    /// Static allocation with an owner slot, fatal on exhaustion.
    pub fn allocate_static_weak(&mut self, size: usize) -> WeakBlock {
        self.allocate_weak(size, Tag::STATIC)
    }

    /// Level-scoped allocation with an owner slot, fatal on exhaustion.
    pub fn allocate_level_weak(&mut self, size: usize) -> WeakBlock {
        self.allocate_weak(size, Tag::LEVEL)
    }

    /// Level-scoped, zero-filled allocation, fatal on exhaustion.
    pub fn allocate_level_zeroed(&mut self, size: usize) -> BlockHandle {
        let handle = self.allocate(size, Tag::LEVEL);
        self.payload_mut(handle).fill(0);
        handle
    }

    /// Zero-filled allocation for a level special, fatal on exhaustion.
    pub fn allocate_levspec_zeroed(&mut self, size: usize) -> BlockHandle {
        let handle = self.allocate(size, Tag::LEVSPEC);
        self.payload_mut(handle).fill(0);
        handle
    }

    /// Cache allocation, fatal on exhaustion.
    ///
    /// Cache blocks are evicted by later allocations whenever space is
    /// short, so they always carry an owner slot.
    pub fn allocate_cache(&mut self, size: usize) -> WeakBlock {
        self.allocate_weak(size, Tag::CACHE)
    }

    fn out_of_memory(&self, context: &'static str, requested: usize) -> ! {
        self.fatal(
            context,
            ZoneError::OutOfMemory {
                requested,
                largest_free: self.largest_free_block(),
                total_free: self.total_free_memory(),
            },
        )
    }

    /// Find, carve and claim a block. Returns the record index and the
    /// owner slot if one was requested.
    fn try_malloc(
        &mut self,
        context: &'static str,
        size: usize,
        tag: Tag,
        owned: bool,
    ) -> Option<(u32, Option<WeakBlock>)> {
        if !tag.is_allocatable() {
            self.fatal(context, ZoneError::InvalidTag { tag });
        }
        let needed = u32::try_from(block_size_for(size)?).ok()?;

        let mut base = self.rover;
        let behind = self.blocks.get(base).prev;
        if self.blocks.is_free(behind) {
            base = behind;
        }

        let mut cursor = base;
        // The block behind the starting point is the last one examined.
        let last = self.blocks.get(base).prev;
        loop {
            let lap_done = cursor == last;

            let rec = self.blocks.get(cursor);
            if rec.is_free() {
                cursor = rec.next;
            } else if cursor == SENTINEL || !rec.tag.is_purgeable(self.config.purge_level) {
                base = rec.next;
                cursor = base;
            } else {
                // The run is either `cursor` itself or a single free block
                // right before it, so the merged survivor is the new run.
                debug!(
                    offset = rec.offset,
                    size = rec.size,
                    tag = %rec.tag,
                    "evicting purgeable block"
                );
                base = self.free_block(cursor);
                cursor = self.blocks.get(base).next;
            }

            let run = self.blocks.get(base);
            if run.is_free() && run.size >= needed {
                break;
            }
            if lap_done {
                // Scanned all the way around the list.
                return None;
            }
        }

        let leftover = self.blocks.get(base).size - needed;
        if leftover as usize > self.config.min_fragment {
            let tail = self.blocks.split(base, needed);
            let tail_offset = self.blocks.get(tail).offset;
            header::write(&mut self.memory, tail_offset, tail, leftover);
            let base_offset = self.blocks.get(base).offset;
            header::write(&mut self.memory, base_offset, base, needed);
        }

        let weak = owned.then(|| self.owners.insert(base));
        let rec = self.blocks.get_mut(base);
        rec.tag = tag;
        rec.user = Some(weak.map_or(User::Anonymous, User::Weak));
        let granted = rec.size as usize;
        let offset = rec.offset;

        // Next allocation starts looking after this block.
        self.rover = rec.next;

        self.allocated_bytes += granted;
        if self.config.instrumented {
            trace!(
                offset,
                size = granted,
                running = self.allocated_bytes,
                "alloc"
            );
        }

        Some((base, weak))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use zonealloc_core::layout::{HEADER_SIZE, PARAGRAPH_SIZE};
    use zonealloc_core::{ArenaSpan, FatalError, PanicReporter};

    use crate::config::ZoneConfig;

    fn zone(bytes: usize) -> Zone {
        Zone::new(
            ArenaSpan::zeroed(bytes),
            ZoneConfig::default(),
            Box::new(PanicReporter),
        )
        .unwrap()
    }

    fn zone_with(bytes: usize, config: ZoneConfig) -> Zone {
        Zone::new(ArenaSpan::zeroed(bytes), config, Box::new(PanicReporter)).unwrap()
    }

    fn fatal_of(f: impl FnOnce()) -> FatalError {
        let payload = catch_unwind(AssertUnwindSafe(f)).unwrap_err();
        *payload.downcast::<FatalError>().unwrap()
    }

    #[test]
    fn allocation_rounds_to_paragraphs() {
        let mut z = zone(4096);
        let h = z.allocate_static(100);
        assert_eq!(z.capacity(h), 112);
        assert_eq!(h.offset(), HEADER_SIZE);
        z.verify_heap().unwrap();
    }

    #[test]
    fn allocation_splits_off_free_tail() {
        let mut z = zone(4096);
        let _ = z.allocate_static(100);
        assert_eq!(z.blocks.len(), 2);
        assert_eq!(z.total_free_memory(), 4096 - 128);
    }

    #[test]
    fn small_leftover_is_granted_whole() {
        let mut z = zone(4096);
        // 4096 - (4010 rounded + header) = 64, not above the fragment limit.
        let h = z.allocate_static(4010);
        assert_eq!(z.capacity(h), 4096 - HEADER_SIZE);
        assert_eq!(z.blocks.len(), 1);
        assert_eq!(z.total_free_memory(), 0);
    }

    #[test]
    fn rover_advances_past_allocation() {
        let mut z = zone(4096);
        let a = z.allocate_static(32);
        let b = z.allocate_static(32);
        assert!(b.offset() > a.offset());
        assert_eq!(b.offset(), a.offset() + 48);
    }

    #[test]
    fn zero_size_gets_header_only_block() {
        let mut z = zone(4096);
        let h = z.allocate_static(0);
        assert_eq!(z.capacity(h), 0);
        z.verify_heap().unwrap();
    }

    #[test]
    fn exhaustion_returns_none() {
        let mut z = zone(1024);
        assert!(z.try_allocate_static(2048).is_none());
        let _ = z.allocate_static(512);
        assert!(z.try_allocate_static(600).is_none());
        z.verify_heap().unwrap();
    }

    #[test]
    fn huge_request_returns_none() {
        let mut z = zone(1024);
        assert!(z.try_allocate_static(usize::MAX).is_none());
    }

    #[test]
    fn allocate_exhaustion_is_fatal_with_diagnostics() {
        let mut z = zone(1024);
        let fatal = fatal_of(|| {
            let _ = z.allocate_static(4096);
        });
        assert_eq!(fatal.context, "allocate");
        assert_eq!(
            fatal.error,
            ZoneError::OutOfMemory {
                requested: 4096,
                largest_free: 1024,
                total_free: 1024,
            }
        );
    }

    #[test]
    fn free_tag_rejected() {
        let mut z = zone(1024);
        let fatal = fatal_of(|| {
            let _ = z.try_allocate(16, Tag::FREE);
        });
        assert_eq!(fatal.error, ZoneError::InvalidTag { tag: Tag::FREE });
    }

    #[test]
    fn purgeable_block_evicted_to_make_room() {
        let mut z = zone(1024);
        let cache = z.allocate_cache(900);
        assert!(z.is_live(cache));
        let h = z.allocate_static(200);
        assert!(!z.is_live(cache));
        assert!(z.upgrade(cache).is_none());
        assert_eq!(z.tag(h), Tag::STATIC);
        z.verify_heap().unwrap();
    }

    #[test]
    fn non_purgeable_block_never_evicted() {
        let mut z = zone(1024);
        let keep = z.allocate_level_weak(900);
        assert!(z.try_allocate_static(200).is_none());
        assert!(z.is_live(keep));
    }

    #[test]
    fn eviction_follows_list_order_from_rover() {
        let mut z = zone(1024);
        // Three cache blocks of 256 B each plus a 256 B free tail.
        let a = z.allocate_cache(240);
        let b = z.allocate_cache(240);
        let c = z.allocate_cache(240);
        // Rover sits on the free tail, so the scan wraps to `a` and `b`
        // before it could reach the most recently allocated `c`.
        let _ = z.allocate_static(400);
        assert!(!z.is_live(a));
        assert!(!z.is_live(b));
        assert!(z.is_live(c));
        z.verify_heap().unwrap();
    }

    #[test]
    fn lowest_purge_level_never_evicts_sentinel() {
        let config = ZoneConfig {
            purge_level: Tag::LEVEL,
            ..ZoneConfig::default()
        };
        let mut z = zone_with(1024, config);
        let a = z.allocate_weak(400, Tag::LEVEL);
        let b = z.allocate_weak(400, Tag::LEVEL);
        // The lap passes the sentinel before reaching `a` and `b`.
        let h = z.try_allocate_weak(500, Tag::STATIC);
        assert!(h.is_some());
        assert!(!z.is_live(a));
        assert!(!z.is_live(b));
        assert_eq!(z.blocks.get(SENTINEL).offset, 1024);
        assert!(!z.blocks.is_free(SENTINEL));
        z.verify_heap().unwrap();
    }

    #[test]
    fn failed_lap_at_lowest_purge_level_leaves_heap_intact() {
        let config = ZoneConfig {
            purge_level: Tag::LEVEL,
            ..ZoneConfig::default()
        };
        let mut z = zone_with(1024, config);
        let s = z.allocate_static(400);
        let l = z.allocate_weak(400, Tag::LEVEL);
        assert!(z.try_allocate_static(700).is_none());
        assert!(!z.is_live(l));
        assert_eq!(z.tag(s), Tag::STATIC);
        assert_eq!(z.blocks.get(SENTINEL).offset, 1024);
        z.verify_heap().unwrap();
    }

    #[test]
    fn zeroed_allocations_clear_payload() {
        let mut z = zone(1024);
        let h = z.allocate_static(64);
        z.payload_mut(h).fill(0xFF);
        z.free(h);
        let lvl = z.allocate_level_zeroed(64);
        assert!(z.payload(lvl).iter().all(|&b| b == 0));
        assert_eq!(z.tag(lvl), Tag::LEVEL);
        let spec = z.allocate_levspec_zeroed(30);
        assert!(z.payload(spec).iter().all(|&b| b == 0));
        assert_eq!(z.tag(spec), Tag::LEVSPEC);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn capacity_covers_request(sizes in proptest::collection::vec(0usize..2000, 1..20)) {
                let mut z = zone(64 * 1024);
                for size in sizes {
                    if let Some(h) = z.try_allocate_static(size) {
                        let cap = z.capacity(h);
                        prop_assert!(cap >= size);
                        prop_assert_eq!(cap % PARAGRAPH_SIZE, 0);
                        prop_assert_eq!(h.offset() % PARAGRAPH_SIZE, 0);
                    }
                }
                prop_assert!(z.verify_heap().is_ok());
            }
        }
    }
}
