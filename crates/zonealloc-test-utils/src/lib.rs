//! Test utilities for zonealloc development.
//!
//! Provides zone builders that panic instead of exiting on fatal errors,
//! a [`expect_fatal`] helper to capture those panics, an independent heap
//! layout walker ([`assert_heap_invariants`]) and a seeded allocation
//! workload ([`ChurnWorkload`]).

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod workload;

use std::panic::{catch_unwind, AssertUnwindSafe};

use zonealloc_arena::{Zone, ZoneConfig};
use zonealloc_core::{ArenaSpan, FatalError, PanicReporter, Tag, PARAGRAPH_SIZE};

pub use workload::{ChurnOp, ChurnStats, ChurnWorkload};

/// Zone over a zeroed arena of `bytes` bytes with the default config.
pub fn zone(bytes: usize) -> Zone {
    zone_with(bytes, ZoneConfig::default())
}

/// Zone over a zeroed arena of `bytes` bytes.
///
/// Fatal errors panic with a [`FatalError`] payload.
pub fn zone_with(bytes: usize, config: ZoneConfig) -> Zone {
    match Zone::new(ArenaSpan::zeroed(bytes), config, Box::new(PanicReporter)) {
        Ok(zone) => zone,
        Err(e) => panic!("test zone of {bytes} B rejected: {e}"),
    }
}

/// Run `f` and return the fatal error it reported.
///
/// Panics if `f` returns normally or panics with anything other than a
/// [`FatalError`].
pub fn expect_fatal<F: FnOnce()>(f: F) -> FatalError {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => panic!("expected a fatal error, call returned normally"),
        Err(payload) => match payload.downcast::<FatalError>() {
            Ok(fatal) => *fatal,
            Err(_) => panic!("panicked without a FatalError payload"),
        },
    }
}

/// Check the heap shape through the public block walk.
///
/// Independent of [`Zone::verify_heap`]: tiling from offset zero to the
/// arena end, paragraph-multiple sizes, free blocks untagged and unowned,
/// no two free blocks adjacent, and owner slots resolving back to their
/// own block.
pub fn assert_heap_invariants(zone: &Zone) {
    let mut offset = 0;
    let mut prev_free = false;
    for block in zone.blocks() {
        assert_eq!(block.offset, offset, "gap or overlap before {block:?}");
        assert!(block.size > 0, "empty block {block:?}");
        assert_eq!(block.size % PARAGRAPH_SIZE, 0, "unaligned {block:?}");
        if block.free {
            assert_eq!(block.tag, Tag::FREE, "tagged free block {block:?}");
            assert!(block.owner.is_none(), "owned free block {block:?}");
            assert!(!prev_free, "adjacent free blocks at {offset:#x}");
        } else {
            assert_ne!(block.tag, Tag::FREE, "untagged live block {block:?}");
            if let Some(weak) = block.owner {
                assert_eq!(zone.upgrade(weak), Some(block.handle()));
            }
        }
        prev_free = block.free;
        offset += block.size;
    }
    assert_eq!(offset, zone.arena_bytes(), "blocks do not reach arena end");
    assert_eq!(zone.verify_heap(), Ok(()));
}
