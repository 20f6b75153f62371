//! Platform glue for zonealloc.
//!
//! The zone itself only needs two things from its host: a flat memory
//! span, obtained once, and a fatal reporter. This crate supplies the
//! first through [`ArenaProbe`] implementations, wires up `tracing`
//! output, and bundles both into [`init_zone`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod logging;
pub mod probe;

use std::error::Error;
use std::fmt;

use zonealloc_arena::{ConfigError, Zone, ZoneConfig};
use zonealloc_core::{ExitReporter, FatalReporter};

pub use logging::init_logging;
pub use probe::{ArenaProbe, FixedProbe, HostProbe, ProbeError};

/// Errors raised while bringing up a zone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartupError {
    /// No arena could be obtained.
    Probe(ProbeError),
    /// The arena or configuration was rejected.
    Config(ConfigError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Probe(e) => write!(f, "arena probe failed: {e}"),
            Self::Config(e) => write!(f, "zone configuration rejected: {e}"),
        }
    }
}

impl Error for StartupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Probe(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<ProbeError> for StartupError {
    fn from(e: ProbeError) -> Self {
        Self::Probe(e)
    }
}

impl From<ConfigError> for StartupError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Probe an arena and build a zone on it.
pub fn init_zone_with(
    probe: &mut dyn ArenaProbe,
    config: ZoneConfig,
    reporter: Box<dyn FatalReporter>,
) -> Result<Zone, StartupError> {
    let span = probe.probe()?;
    Ok(Zone::new(span, config, reporter)?)
}

/// Build a zone on host memory with the default [`HostProbe`] and an
/// [`ExitReporter`].
pub fn init_zone(config: ZoneConfig) -> Result<Zone, StartupError> {
    init_zone_with(&mut HostProbe::default(), config, Box::new(ExitReporter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonealloc_core::{ArenaSpan, PanicReporter, Tag};

    #[test]
    fn init_zone_uses_host_memory() {
        let zone = init_zone(ZoneConfig::default()).unwrap();
        assert_eq!(zone.arena_bytes(), HostProbe::DEFAULT_MAX_BYTES);
        assert_eq!(zone.total_free_memory(), zone.arena_bytes());
    }

    #[test]
    fn init_zone_with_fixed_span() {
        let mut probe = FixedProbe::zeroed(4096);
        let mut zone =
            init_zone_with(&mut probe, ZoneConfig::default(), Box::new(PanicReporter)).unwrap();
        let h = zone.allocate(100, Tag::STATIC);
        assert_eq!(zone.capacity(h), 112);
    }

    #[test]
    fn startup_errors_propagate() {
        let mut probe = FixedProbe::new(ArenaSpan::zeroed(8));
        let err = init_zone_with(&mut probe, ZoneConfig::default(), Box::new(PanicReporter))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            StartupError::Config(ConfigError::ArenaTooSmall { .. })
        ));

        let err = init_zone_with(&mut probe, ZoneConfig::default(), Box::new(PanicReporter))
            .err()
            .unwrap();
        assert_eq!(err, StartupError::Probe(ProbeError::Exhausted));
    }
}
