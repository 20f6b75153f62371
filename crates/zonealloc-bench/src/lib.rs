//! Benchmark profiles for the zonealloc zone allocator.
//!
//! - [`level_profile`]: a zone populated the way a loaded level leaves it,
//!   statics first, then level data, then a cache filling the rest.
//! - [`cache_profile`]: a zone packed with small cache entries, the worst
//!   case for an eviction sweep.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use zonealloc_arena::Zone;
use zonealloc_core::{Tag, HEADER_SIZE};
use zonealloc_test_utils::{zone, ChurnWorkload};

/// Default arena for benchmark profiles, matching the host probe cap.
pub const PROFILE_ARENA_BYTES: usize = 8 * 1024 * 1024;

/// Zone in the state a level load leaves it in.
pub fn level_profile(seed: u64) -> Zone {
    let mut z = zone(PROFILE_ARENA_BYTES);
    for _ in 0..64 {
        let _ = z.allocate_static(4096);
    }
    for _ in 0..512 {
        let _ = z.allocate_level_weak(2048);
    }
    ChurnWorkload::new(seed, 8192).run(&mut z, 2000);
    fill_with_cache(&mut z, 16 * 1024);
    z
}

/// Zone whose free space is entirely taken by `entry_bytes`-sized cache
/// entries.
pub fn cache_profile(arena_bytes: usize, entry_bytes: usize) -> Zone {
    let mut z = zone(arena_bytes);
    fill_with_cache(&mut z, entry_bytes);
    z
}

/// Allocate as many cache entries as the current free space holds.
///
/// Bounded up front: once the arena is full, further cache allocations
/// would just evict earlier entries.
fn fill_with_cache(z: &mut Zone, entry_bytes: usize) {
    let entries = z.total_free_memory() / (entry_bytes + HEADER_SIZE);
    for _ in 0..entries {
        if z.try_allocate_weak(entry_bytes, Tag::CACHE).is_none() {
            break;
        }
    }
}
