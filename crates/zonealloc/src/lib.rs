//! Zonealloc: a tagged zone allocator over one fixed arena.
//!
//! This is the facade crate that re-exports the public API from the
//! zonealloc sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use zonealloc::prelude::*;
//!
//! let mut probe = FixedProbe::zeroed(64 * 1024);
//! let mut zone =
//!     init_zone_with(&mut probe, ZoneConfig::default(), Box::new(PanicReporter)).unwrap();
//!
//! // Permanent data.
//! let table = zone.allocate_static(1000);
//! zone.payload_mut(table)[0] = 42;
//!
//! // A cache entry: later allocations may evict it when space runs short.
//! let sprite = zone.allocate_cache(60 * 1024);
//! assert!(zone.is_live(sprite));
//!
//! // This does not fit next to the cache entry, so the entry goes.
//! let level = zone.allocate_level_zeroed(8 * 1024);
//! assert!(!zone.is_live(sprite));
//! assert!(zone.upgrade(sprite).is_none());
//!
//! // Leaving the level releases everything level-scoped.
//! assert_eq!(zone.free_level_tags(), 1);
//! assert_eq!(zone.tag(table), Tag::STATIC);
//! zone.check_heap();
//! # let _ = level;
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `zonealloc-core` | Tags, granularity, errors, fatal reporters |
//! | [`arena`] | `zonealloc-arena` | The `Zone`, handles, configuration, statistics |
//! | [`platform`] | `zonealloc-platform` | Arena probes, logging, zone bootstrap |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Tags, layout constants, errors and fatal reporters (`zonealloc-core`).
pub use zonealloc_core as types;

/// The zone allocator itself (`zonealloc-arena`).
///
/// [`arena::Zone`] is also available in the [`prelude`].
pub use zonealloc_arena as arena;

/// Arena probes, logging and bootstrap (`zonealloc-platform`).
pub use zonealloc_platform as platform;

/// Common imports for typical zonealloc usage.
///
/// ```rust
/// use zonealloc::prelude::*;
/// ```
pub mod prelude {
    // Allocator
    pub use zonealloc_arena::{BlockHandle, WeakBlock, Zone, ZoneConfig, ZoneStats};

    // Core types
    pub use zonealloc_core::{ArenaSpan, Tag};

    // Errors and fatal reporting
    pub use zonealloc_arena::ConfigError;
    pub use zonealloc_core::{ExitReporter, FatalError, FatalReporter, PanicReporter, ZoneError};

    // Platform
    pub use zonealloc_platform::{
        init_logging, init_zone, init_zone_with, ArenaProbe, FixedProbe, HostProbe, StartupError,
    };
}
