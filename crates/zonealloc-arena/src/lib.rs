//! Tagged zone allocator over a single fixed arena.
//!
//! A [`Zone`] owns one contiguous arena, obtained once at startup, and
//! hands out paragraph-aligned blocks from it. Every block carries a purge
//! [`Tag`](zonealloc_core::Tag): blocks below the purge level live until
//! freed explicitly, blocks at or above it are cache entries that any later
//! allocation may evict to make room.
//!
//! # Architecture
//!
//! ```text
//! Zone
//! ├── memory: Vec<u8>          arena bytes, one 16 B header per block
//! ├── BlockList                block records, circular, arena order
//! │   ├── sentinel (record 0)  at offset arena_bytes, always occupied
//! │   └── spare records        recycled by split/merge
//! ├── OwnerTable               slot+generation registry behind WeakBlock
//! ├── rover                    next-fit resume point
//! └── FatalReporter            never returns
//! ```
//!
//! # Handles
//!
//! - [`BlockHandle`]: payload offset, validated against the in-arena
//!   header on every use.
//! - [`WeakBlock`]: owner slot that stops resolving once the block is
//!   freed, evicted or released by a bulk tag free.
//!
//! # Failure model
//!
//! `try_` entry points return `None` on exhaustion. Everything else that
//! goes wrong (exhaustion in the non-`try_` variants, stale or misaligned
//! handles, corruption found by [`Zone::check_heap`]) goes to the zone's
//! [`FatalReporter`](zonealloc_core::FatalReporter).
//!
//! A zone is single-context: it is neither `Send` nor `Sync`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod alloc;
mod block;
mod check;
pub mod config;
mod free;
pub mod handle;
mod header;
mod owner;
pub mod stats;
pub mod zone;

pub use config::{ConfigError, ZoneConfig};
pub use handle::{BlockHandle, WeakBlock};
pub use stats::{BlockInfo, Blocks, ZoneStats};
pub use zone::Zone;
