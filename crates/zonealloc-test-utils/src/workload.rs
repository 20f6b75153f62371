//! Seeded allocation workloads.
//!
//! [`ChurnWorkload`] drives a zone with a reproducible mix of static,
//! level and cache allocations, explicit frees and level teardowns, the
//! pattern a game engine produces while streaming levels in and out.

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use zonealloc_arena::{BlockHandle, WeakBlock, Zone};
use zonealloc_core::Tag;

/// One step of a churn workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChurnOp {
    /// Try to allocate `size` bytes with `tag`.
    Alloc { size: usize, tag: Tag },
    /// Free the `n`th live handle (modulo the live count).
    Free { n: usize },
    /// Free every level-scoped block.
    FreeLevel,
}

/// Reproducible stream of [`ChurnOp`]s.
pub struct ChurnWorkload {
    rng: ChaCha8Rng,
    max_size: usize,
}

impl ChurnWorkload {
    pub fn new(seed: u64, max_size: usize) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            max_size: max_size.max(1),
        }
    }

    /// Next operation.
    pub fn next_op(&mut self) -> ChurnOp {
        let roll = self.rng.next_u32() % 100;
        let size = self.rng.next_u32() as usize % self.max_size;
        match roll {
            0..=24 => ChurnOp::Alloc {
                size,
                tag: Tag::STATIC,
            },
            25..=44 => ChurnOp::Alloc {
                size,
                tag: Tag::LEVEL,
            },
            45..=64 => ChurnOp::Alloc {
                size,
                tag: Tag::CACHE,
            },
            65..=97 => ChurnOp::Free {
                n: self.rng.next_u32() as usize,
            },
            _ => ChurnOp::FreeLevel,
        }
    }

    /// Apply `steps` operations to `zone`, tracking live handles.
    ///
    /// Cache blocks are held through [`WeakBlock`]s and dropped from the
    /// tracker once evicted.
    pub fn run(&mut self, zone: &mut Zone, steps: usize) -> ChurnStats {
        let mut live: Vec<BlockHandle> = Vec::new();
        let mut cached: Vec<WeakBlock> = Vec::new();
        let mut stats = ChurnStats::default();

        for _ in 0..steps {
            match self.next_op() {
                ChurnOp::Alloc { size, tag } if tag == Tag::CACHE => {
                    match zone.try_allocate_weak(size, tag) {
                        Some(weak) => {
                            cached.push(weak);
                            stats.allocations += 1;
                        }
                        None => stats.failures += 1,
                    }
                }
                ChurnOp::Alloc { size, tag } => match zone.try_allocate(size, tag) {
                    Some(handle) => {
                        live.push(handle);
                        stats.allocations += 1;
                    }
                    None => stats.failures += 1,
                },
                ChurnOp::Free { n } if !live.is_empty() => {
                    let handle = live.swap_remove(n % live.len());
                    zone.free(handle);
                    stats.frees += 1;
                }
                ChurnOp::Free { .. } => {}
                ChurnOp::FreeLevel => {
                    zone.free_level_tags();
                    live.retain(|h| is_static(zone, *h));
                }
            }
            let before = cached.len();
            cached.retain(|w| zone.is_live(*w));
            stats.evictions += before - cached.len();
        }
        stats
    }
}

/// Whether `handle` still names a live static block.
///
/// Only called for handles that were live before a level teardown, whose
/// blocks are either still allocated or now part of a free block.
fn is_static(zone: &Zone, handle: BlockHandle) -> bool {
    zone.blocks()
        .any(|b| !b.free && b.handle() == handle && b.tag == Tag::STATIC)
}

/// Counters collected by [`ChurnWorkload::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChurnStats {
    pub allocations: usize,
    pub failures: usize,
    pub frees: usize,
    pub evictions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert_heap_invariants, zone};

    #[test]
    fn same_seed_same_ops() {
        let mut a = ChurnWorkload::new(7, 512);
        let mut b = ChurnWorkload::new(7, 512);
        for _ in 0..100 {
            assert_eq!(a.next_op(), b.next_op());
        }
    }

    #[test]
    fn churn_keeps_heap_consistent() {
        let mut z = zone(64 * 1024);
        let stats = ChurnWorkload::new(42, 2048).run(&mut z, 2000);
        assert!(stats.allocations > 0);
        assert_heap_invariants(&z);
    }
}
