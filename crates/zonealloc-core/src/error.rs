//! Error types for the zone allocator.
//!
//! Three families share one enum: exhaustion (recoverable through the
//! `try_` entry points), invalid handles (programmer errors), and heap
//! corruption found by the integrity checker. Offsets are arena-relative
//! byte offsets of the block header involved.

use std::error::Error;
use std::fmt;

use crate::tag::Tag;

/// Errors raised by zone operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ZoneError {
    /// No block large enough could be found or made by eviction.
    OutOfMemory {
        /// Number of payload bytes requested.
        requested: usize,
        /// Largest free block at the time of failure, header included.
        largest_free: usize,
        /// Sum of all free blocks, headers included.
        total_free: usize,
    },
    /// A handle that is not on a paragraph boundary.
    Misaligned {
        /// The offending payload offset.
        offset: usize,
    },
    /// A handle that points outside the arena.
    OutOfRange {
        /// The offending payload offset.
        offset: usize,
        /// Size of the arena in bytes.
        arena_bytes: usize,
    },
    /// A block header does not carry [`ZONE_ID`](crate::ZONE_ID).
    BadMarker {
        /// Header offset.
        offset: usize,
        /// Marker value found instead.
        found: u16,
    },
    /// A block header disagrees with the allocator's bookkeeping.
    HeaderMismatch {
        /// Header offset.
        offset: usize,
    },
    /// Free or tag change on a block that is already free.
    AlreadyFree {
        /// Header offset.
        offset: usize,
    },
    /// A tag that cannot be assigned to a live block.
    InvalidTag {
        /// The rejected tag.
        tag: Tag,
    },
    /// A block's size does not touch the next block.
    TilingGap {
        /// Header offset.
        offset: usize,
        /// Recorded block size.
        size: usize,
        /// Offset of the next block.
        next: usize,
    },
    /// The next block does not link back to this one.
    BrokenBackLink {
        /// Header offset.
        offset: usize,
    },
    /// Two consecutive free blocks.
    AdjacentFree {
        /// Header offset of the first of the pair.
        offset: usize,
    },
    /// A free block still carries a tag or an owner.
    FreeBlockTagged {
        /// Header offset.
        offset: usize,
        /// Tag found on the free block.
        tag: Tag,
    },
    /// A block size that is not a multiple of the granularity.
    SizeNotAligned {
        /// Header offset.
        offset: usize,
        /// Recorded block size.
        size: usize,
    },
}

impl ZoneError {
    /// Whether this error signals corrupted bookkeeping rather than
    /// exhaustion or a bad argument.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::BadMarker { .. }
                | Self::HeaderMismatch { .. }
                | Self::TilingGap { .. }
                | Self::BrokenBackLink { .. }
                | Self::AdjacentFree { .. }
                | Self::FreeBlockTagged { .. }
                | Self::SizeNotAligned { .. }
        )
    }
}

impl fmt::Display for ZoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                largest_free,
                total_free,
            } => {
                write!(
                    f,
                    "failed to allocate {requested} B, max free block {largest_free} B, total free {total_free} B"
                )
            }
            Self::Misaligned { offset } => {
                write!(f, "pointer is not aligned: {offset:#x}")
            }
            Self::OutOfRange {
                offset,
                arena_bytes,
            } => {
                write!(
                    f,
                    "pointer {offset:#x} lies outside the {arena_bytes} B arena"
                )
            }
            Self::BadMarker { offset, found } => {
                write!(
                    f,
                    "block at {offset:#x} has id {found:#x} instead of ZONEID"
                )
            }
            Self::HeaderMismatch { offset } => {
                write!(f, "block header at {offset:#x} does not match bookkeeping")
            }
            Self::AlreadyFree { offset } => {
                write!(f, "block at {offset:#x} is already free")
            }
            Self::InvalidTag { tag } => {
                write!(f, "{tag} is not a valid allocation tag")
            }
            Self::TilingGap { offset, size, next } => {
                write!(
                    f,
                    "block size does not touch the next block: {offset:#x} + {size} != {next:#x}"
                )
            }
            Self::BrokenBackLink { offset } => {
                write!(
                    f,
                    "next block doesn't have proper back link (block at {offset:#x})"
                )
            }
            Self::AdjacentFree { offset } => {
                write!(f, "two consecutive free blocks at {offset:#x}")
            }
            Self::FreeBlockTagged { offset, tag } => {
                write!(f, "free block at {offset:#x} still carries {tag}")
            }
            Self::SizeNotAligned { offset, size } => {
                write!(
                    f,
                    "block at {offset:#x} has size {size}, not a paragraph multiple"
                )
            }
        }
    }
}

impl Error for ZoneError {}
