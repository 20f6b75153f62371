//! Arena probes: the one-time source of the zone's memory.

use std::error::Error;
use std::fmt;

use tracing::{debug, warn};

use zonealloc_arena::ZoneConfig;
use zonealloc_core::layout::{paragraph_align_down, PARAGRAPH_SIZE};
use zonealloc_core::ArenaSpan;

/// Supplies the arena a zone is built on. Called once at startup.
pub trait ArenaProbe {
    /// Obtain the arena span.
    fn probe(&mut self) -> Result<ArenaSpan, ProbeError>;
}

/// Errors from an [`ArenaProbe`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeError {
    /// The host refused every size down to the minimum arena.
    HostRefused {
        /// Largest size attempted.
        max_bytes: usize,
        /// Smallest size attempted.
        min_bytes: usize,
    },
    /// The probe has already handed out its span.
    Exhausted,
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostRefused {
                max_bytes,
                min_bytes,
            } => write!(
                f,
                "host refused every arena size from {max_bytes} B down to {min_bytes} B"
            ),
            Self::Exhausted => write!(f, "arena span already taken"),
        }
    }
}

impl Error for ProbeError {}

/// Requests memory from the host allocator.
///
/// Starts at `max_bytes` (rounded down to whole paragraphs) and shrinks
/// one paragraph at a time until the host grants the reservation. A host
/// that refuses everything costs one reservation attempt per paragraph,
/// about half a million from the 8 MiB default.
#[derive(Clone, Debug)]
pub struct HostProbe {
    /// Upper bound on the arena size.
    ///
    /// Default: 8 MiB.
    pub max_bytes: usize,
}

impl HostProbe {
    /// Default cap on the arena size.
    pub const DEFAULT_MAX_BYTES: usize = 8 * 1024 * 1024;

    /// Probe capped at `max_bytes`.
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_BYTES)
    }
}

impl ArenaProbe for HostProbe {
    fn probe(&mut self) -> Result<ArenaSpan, ProbeError> {
        let max_bytes = paragraph_align_down(self.max_bytes);
        let min_bytes = ZoneConfig::MIN_ARENA_BYTES;
        let mut bytes = max_bytes;
        while bytes >= min_bytes {
            let mut memory = Vec::new();
            if memory.try_reserve_exact(bytes).is_ok() {
                memory.resize(bytes, 0);
                debug!(bytes, max_bytes, "host granted arena");
                return Ok(ArenaSpan::new(memory));
            }
            bytes -= PARAGRAPH_SIZE;
        }
        warn!(max_bytes, "host refused arena");
        Err(ProbeError::HostRefused {
            max_bytes,
            min_bytes,
        })
    }
}

/// Hands out one pre-built span. Useful for embedding and tests.
#[derive(Debug)]
pub struct FixedProbe {
    span: Option<ArenaSpan>,
}

impl FixedProbe {
    /// Probe that yields `span` once.
    pub fn new(span: ArenaSpan) -> Self {
        Self { span: Some(span) }
    }

    /// Probe that yields a zeroed span of `bytes` bytes once.
    pub fn zeroed(bytes: usize) -> Self {
        Self::new(ArenaSpan::zeroed(bytes))
    }
}

impl ArenaProbe for FixedProbe {
    fn probe(&mut self) -> Result<ArenaSpan, ProbeError> {
        self.span.take().ok_or(ProbeError::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_probe_rounds_down_to_paragraphs() {
        let span = HostProbe::new(4100).probe().unwrap();
        assert_eq!(span.len(), 4096);
    }

    #[test]
    fn host_probe_default_cap() {
        assert_eq!(HostProbe::default().max_bytes, 8 * 1024 * 1024);
    }

    #[test]
    fn host_probe_below_minimum_fails() {
        let err = HostProbe::new(8).probe().unwrap_err();
        assert!(matches!(err, ProbeError::HostRefused { .. }));
    }

    #[test]
    fn fixed_probe_yields_once() {
        let mut probe = FixedProbe::zeroed(256);
        assert_eq!(probe.probe().unwrap().len(), 256);
        assert_eq!(probe.probe().unwrap_err(), ProbeError::Exhausted);
    }
}
