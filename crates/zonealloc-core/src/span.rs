//! The flat memory span a zone is built on.

use std::fmt;

/// A contiguous block of host memory handed to the zone at startup.
///
/// The zone takes ownership of the span for the rest of the process.
/// `base` is the host address the span started at; the allocator never
/// interprets it, all bookkeeping is relative to the start of `memory`.
pub struct ArenaSpan {
    base: usize,
    memory: Vec<u8>,
}

impl ArenaSpan {
    /// Wrap host memory as an arena span.
    pub fn new(memory: Vec<u8>) -> Self {
        Self {
            base: memory.as_ptr() as usize,
            memory,
        }
    }

    /// Zero-filled span of `bytes` bytes.
    pub fn zeroed(bytes: usize) -> Self {
        Self::new(vec![0; bytes])
    }

    /// Host address of the first byte.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Size of the span in bytes.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Whether the span holds no memory at all.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Give up the span, returning its base address and backing memory.
    pub fn into_parts(self) -> (usize, Vec<u8>) {
        (self.base, self.memory)
    }
}

impl fmt::Debug for ArenaSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaSpan")
            .field("base", &format_args!("{:#x}", self.base))
            .field("len", &self.memory.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_span_has_requested_len() {
        let span = ArenaSpan::zeroed(4096);
        assert_eq!(span.len(), 4096);
        assert!(!span.is_empty());
        let (_, memory) = span.into_parts();
        assert!(memory.iter().all(|&b| b == 0));
    }

    #[test]
    fn base_matches_backing_address() {
        let memory = vec![0u8; 64];
        let addr = memory.as_ptr() as usize;
        let span = ArenaSpan::new(memory);
        assert_eq!(span.base(), addr);
    }
}
