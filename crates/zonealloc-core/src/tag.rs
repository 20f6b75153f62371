//! Purge tags.
//!
//! A [`Tag`] classifies an allocation by how long it must survive. Tags
//! below the purge level are only reclaimed by an explicit free; tags at
//! or above it mark cache-like content that any later allocation may
//! evict.

use std::fmt;

/// Purge classification of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub u8);

impl Tag {
    /// Carried by free blocks only. Never a valid allocation tag.
    pub const FREE: Tag = Tag(0);
    /// Lives for the entire execution.
    pub const STATIC: Tag = Tag(1);
    /// Lives until the current level is exited.
    pub const LEVEL: Tag = Tag(2);
    /// A special thinker within a level.
    pub const LEVSPEC: Tag = Tag(3);
    /// Regenerable content; evicted whenever space is needed.
    pub const CACHE: Tag = Tag(4);
    /// Default purge level: tags at or above this are evictable.
    pub const PURGE_LEVEL: Tag = Tag::CACHE;

    /// Whether a block with this tag may be evicted under `purge_level`.
    pub fn is_purgeable(self, purge_level: Tag) -> bool {
        self >= purge_level
    }

    /// Whether this tag may be assigned to a live block.
    pub fn is_allocatable(self) -> bool {
        self != Tag::FREE
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Tag::FREE => write!(f, "free"),
            Tag::STATIC => write!(f, "static"),
            Tag::LEVEL => write!(f, "level"),
            Tag::LEVSPEC => write!(f, "levspec"),
            Tag::CACHE => write!(f, "cache"),
            Tag(n) => write!(f, "tag {n}"),
        }
    }
}

impl From<u8> for Tag {
    fn from(v: u8) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_ordered_by_lifetime() {
        assert!(Tag::FREE < Tag::STATIC);
        assert!(Tag::STATIC < Tag::LEVEL);
        assert!(Tag::LEVEL < Tag::LEVSPEC);
        assert!(Tag::LEVSPEC < Tag::CACHE);
    }

    #[test]
    fn only_cache_and_above_purgeable_by_default() {
        assert!(!Tag::STATIC.is_purgeable(Tag::PURGE_LEVEL));
        assert!(!Tag::LEVSPEC.is_purgeable(Tag::PURGE_LEVEL));
        assert!(Tag::CACHE.is_purgeable(Tag::PURGE_LEVEL));
        assert!(Tag(9).is_purgeable(Tag::PURGE_LEVEL));
    }

    #[test]
    fn free_tag_not_allocatable() {
        assert!(!Tag::FREE.is_allocatable());
        assert!(Tag::STATIC.is_allocatable());
    }

    #[test]
    fn display_names_known_tags() {
        assert_eq!(Tag::LEVEL.to_string(), "level");
        assert_eq!(Tag(7).to_string(), "tag 7");
    }
}
