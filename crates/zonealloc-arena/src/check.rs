//! Heap integrity checking and free-space diagnostics.

use zonealloc_core::layout::is_paragraph_aligned;
use zonealloc_core::{Tag, ZoneError, ZONE_ID};

use crate::block::SENTINEL;
use crate::header;
use crate::zone::Zone;

impl Zone {
    /// Walk every block and verify the heap shape.
    ///
    /// Checks, in list order: the marker and size mirror of each header,
    /// paragraph-multiple sizes, exact tiling, mutual links, that free
    /// blocks carry no tag or owner, and that no two free blocks touch.
    /// Returns the first violation found.
    pub fn verify_heap(&self) -> Result<(), ZoneError> {
        let mut expected_offset = 0u32;
        let mut prev = SENTINEL;
        let mut prev_free = false;

        for (idx, rec) in self.blocks.iter() {
            let offset = rec.offset as usize;
            if rec.offset != expected_offset || rec.prev != prev {
                return Err(ZoneError::BrokenBackLink { offset });
            }

            let h = header::read(&self.memory, rec.offset);
            if h.marker != ZONE_ID {
                return Err(ZoneError::BadMarker {
                    offset,
                    found: h.marker,
                });
            }
            if h.record != idx || h.size != rec.size {
                return Err(ZoneError::HeaderMismatch { offset });
            }

            let size = rec.size as usize;
            if size == 0 || !is_paragraph_aligned(size) {
                return Err(ZoneError::SizeNotAligned { offset, size });
            }
            let next_offset = self.blocks.get(rec.next).offset;
            if rec.offset.checked_add(rec.size) != Some(next_offset) {
                return Err(ZoneError::TilingGap {
                    offset,
                    size,
                    next: next_offset as usize,
                });
            }

            if rec.is_free() {
                if rec.tag != Tag::FREE {
                    return Err(ZoneError::FreeBlockTagged {
                        offset,
                        tag: rec.tag,
                    });
                }
                if prev_free {
                    let before = self.blocks.get(prev).offset as usize;
                    return Err(ZoneError::AdjacentFree { offset: before });
                }
            } else if rec.tag == Tag::FREE {
                return Err(ZoneError::InvalidTag { tag: rec.tag });
            }

            expected_offset = next_offset;
            prev = idx;
            prev_free = rec.is_free();
        }

        let sentinel = self.blocks.get(SENTINEL);
        if expected_offset != self.arena_bytes || sentinel.prev != prev {
            return Err(ZoneError::BrokenBackLink {
                offset: expected_offset as usize,
            });
        }
        Ok(())
    }

    /// Verify the heap and hand the first violation to the fatal reporter.
    pub fn check_heap(&self) {
        if let Err(e) = self.verify_heap() {
            self.fatal("check_heap", e);
        }
    }

    /// Size of the largest free block in bytes, header included.
    pub fn largest_free_block(&self) -> usize {
        self.blocks
            .iter()
            .filter(|(_, rec)| rec.is_free())
            .map(|(_, rec)| rec.size as usize)
            .max()
            .unwrap_or(0)
    }

    /// Sum of all free block sizes in bytes, headers included.
    ///
    /// Purgeable blocks are not counted even though an allocation could
    /// reclaim them.
    pub fn total_free_memory(&self) -> usize {
        self.blocks
            .iter()
            .filter(|(_, rec)| rec.is_free())
            .map(|(_, rec)| rec.size as usize)
            .sum()
    }

    /// Whether a static allocation of `size` bytes would succeed right now.
    ///
    /// Probes with a real allocation that is freed straight away, so it
    /// may evict purgeable blocks and move the rover. The answer is not a
    /// reservation.
    pub fn is_enough_free_memory(&mut self, size: usize) -> bool {
        match self.try_allocate_static(size) {
            Some(handle) => {
                self.free(handle);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};
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

    #[test]
    fn fresh_zone_verifies() {
        let z = zone(1024);
        assert_eq!(z.verify_heap(), Ok(()));
        z.check_heap();
    }

    #[test]
    fn overwritten_marker_is_fatal() {
        let mut z = zone(4096);
        let _a = z.allocate_static(100);
        let b = z.allocate_static(100);
        let header = b.offset() - zonealloc_core::HEADER_SIZE;
        z.raw_arena_mut()[header] = 0xEF;
        z.raw_arena_mut()[header + 1] = 0xBE;

        let err = z.verify_heap().unwrap_err();
        assert_eq!(
            err,
            ZoneError::BadMarker {
                offset: header,
                found: 0xBEEF
            }
        );
        assert!(err.is_corruption());

        let payload = catch_unwind(AssertUnwindSafe(|| z.check_heap())).unwrap_err();
        let fatal = payload.downcast::<FatalError>().unwrap();
        assert_eq!(fatal.context, "check_heap");
        assert_eq!(fatal.error, err);
    }

    #[test]
    fn overwritten_size_mirror_is_detected() {
        let mut z = zone(4096);
        let a = z.allocate_static(100);
        // Payload overrun into the next header's size field.
        let cap = z.capacity(a);
        let next_header = a.offset() + cap;
        z.raw_arena_mut()[next_header + 8] ^= 0x10;
        assert_eq!(
            z.verify_heap(),
            Err(ZoneError::HeaderMismatch {
                offset: next_header
            })
        );
    }

    #[test]
    fn adjacent_free_blocks_are_reported() {
        let mut z = zone(4096);
        let a = z.allocate_static(100);
        let b = z.allocate_static(100);
        z.free(a);
        // Forge a second free block right after `a`.
        let idx = z.resolve(b).unwrap();
        let rec = z.blocks.get_mut(idx);
        rec.user = None;
        rec.tag = Tag::FREE;
        assert_eq!(z.verify_heap(), Err(ZoneError::AdjacentFree { offset: 0 }));
    }

    #[test]
    fn free_block_with_tag_is_reported() {
        let mut z = zone(4096);
        let first = z.blocks.first();
        z.blocks.get_mut(first).tag = Tag::CACHE;
        assert_eq!(
            z.verify_heap(),
            Err(ZoneError::FreeBlockTagged {
                offset: 0,
                tag: Tag::CACHE
            })
        );
    }

    #[test]
    fn size_drift_is_a_tiling_gap() {
        let mut z = zone(4096);
        let a = z.allocate_static(100);
        let idx = z.resolve(a).unwrap();
        z.blocks.get_mut(idx).size += 16;
        // Keep the header mirror in step so the tiling check is reached.
        let size = z.blocks.get(idx).size;
        header::write(&mut z.memory, 0, idx, size);
        assert_eq!(
            z.verify_heap(),
            Err(ZoneError::TilingGap {
                offset: 0,
                size: 144,
                next: 128
            })
        );
    }

    #[test]
    fn free_space_diagnostics() {
        let mut z = zone(4096);
        assert_eq!(z.largest_free_block(), 4096);
        assert_eq!(z.total_free_memory(), 4096);
        let a = z.allocate_static(100);
        let _b = z.allocate_static(100);
        z.free(a);
        assert_eq!(z.largest_free_block(), 4096 - 256);
        assert_eq!(z.total_free_memory(), 4096 - 128);
    }

    #[test]
    fn enough_free_memory_leaves_heap_unchanged() {
        let mut z = zone(4096);
        let _a = z.allocate_static(100);
        let before = z.total_free_memory();
        assert!(z.is_enough_free_memory(1000));
        assert_eq!(z.total_free_memory(), before);
        assert!(!z.is_enough_free_memory(8000));
        z.verify_heap().unwrap();
    }

    #[test]
    fn enough_free_memory_may_evict() {
        let mut z = zone(1024);
        let cache = z.allocate_cache(900);
        assert!(z.is_enough_free_memory(500));
        assert!(!z.is_live(cache));
    }
}
