//! Core types for the zonealloc zone allocator.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the rest of the workspace: purge [`Tag`]s, the
//! paragraph granularity, the [`ArenaSpan`] handed over by the platform
//! probe, error types, and the [`FatalReporter`] that terminates on
//! unrecoverable conditions.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod fatal;
pub mod layout;
pub mod span;
pub mod tag;

pub use error::ZoneError;
pub use fatal::{ExitReporter, FatalError, FatalReporter, PanicReporter};
pub use layout::{HEADER_SIZE, PARAGRAPH_SIZE, ZONE_ID};
pub use span::ArenaSpan;
pub use tag::Tag;
