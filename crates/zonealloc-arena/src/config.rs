//! Zone configuration parameters and validation.

use std::error::Error;
use std::fmt;

use zonealloc_core::layout::{HEADER_SIZE, PARAGRAPH_SIZE};
use zonealloc_core::Tag;

/// Configuration for a [`Zone`](crate::Zone).
///
/// Validated at construction; all values are immutable afterwards.
#[derive(Clone, Debug)]
pub struct ZoneConfig {
    /// Leftover bytes above which a free block is split on allocation.
    ///
    /// Default: 64. Smaller leftovers are handed to the caller as part of
    /// the allocated block rather than kept as a tiny free fragment.
    pub min_fragment: usize,

    /// Tags at or above this level are evictable.
    ///
    /// Default: [`Tag::CACHE`]. Must be above [`Tag::STATIC`]: static
    /// blocks are never evicted.
    pub purge_level: Tag,

    /// Verify block markers before freeing or retagging a block.
    ///
    /// Default: true.
    pub check_markers: bool,

    /// Verify handle alignment and bounds before resolving a handle.
    ///
    /// Default: true.
    pub range_check: bool,

    /// Emit a trace event with the running allocated byte count on every
    /// allocation and free.
    ///
    /// Default: false.
    pub instrumented: bool,
}

impl ZoneConfig {
    /// Default split threshold in bytes.
    pub const DEFAULT_MIN_FRAGMENT: usize = 64;

    /// Smallest arena a zone can be built on: one header plus one
    /// paragraph of payload.
    pub const MIN_ARENA_BYTES: usize = HEADER_SIZE + PARAGRAPH_SIZE;

    /// Largest arena a zone can be built on. Block offsets and sizes are
    /// stored as `u32`.
    pub const MAX_ARENA_BYTES: usize = (u32::MAX as usize) & !(PARAGRAPH_SIZE - 1);

    /// Check structural invariants of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.purge_level <= Tag::STATIC {
            return Err(ConfigError::InvalidPurgeLevel {
                tag: self.purge_level,
            });
        }
        Ok(())
    }

    /// Check that an arena of `bytes` bytes (after rounding down to whole
    /// paragraphs) can host a zone.
    pub fn validate_arena(bytes: usize) -> Result<(), ConfigError> {
        if bytes < Self::MIN_ARENA_BYTES {
            return Err(ConfigError::ArenaTooSmall {
                bytes,
                minimum: Self::MIN_ARENA_BYTES,
            });
        }
        if bytes > Self::MAX_ARENA_BYTES {
            return Err(ConfigError::ArenaTooLarge {
                bytes,
                maximum: Self::MAX_ARENA_BYTES,
            });
        }
        Ok(())
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            min_fragment: Self::DEFAULT_MIN_FRAGMENT,
            purge_level: Tag::PURGE_LEVEL,
            check_markers: true,
            range_check: true,
            instrumented: false,
        }
    }
}

/// Errors detected while building a zone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The purge level would make free or static blocks evictable.
    InvalidPurgeLevel {
        /// The configured level.
        tag: Tag,
    },
    /// The arena span cannot hold a single block.
    ArenaTooSmall {
        /// Usable bytes in the span.
        bytes: usize,
        /// Minimum accepted size.
        minimum: usize,
    },
    /// The arena span exceeds what block offsets can address.
    ArenaTooLarge {
        /// Usable bytes in the span.
        bytes: usize,
        /// Maximum accepted size.
        maximum: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPurgeLevel { tag } => {
                write!(f, "purge level must be above the static tag, got {tag}")
            }
            Self::ArenaTooSmall { bytes, minimum } => {
                write!(f, "arena of {bytes} B is below the minimum of {minimum} B")
            }
            Self::ArenaTooLarge { bytes, maximum } => {
                write!(f, "arena of {bytes} B exceeds the maximum of {maximum} B")
            }
        }
    }
}

impl Error for ConfigError {}
