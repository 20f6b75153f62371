//! Fatal error reporting.
//!
//! The zone has no strategy for running out of memory mid-frame or for a
//! corrupted heap, so the non-`try` entry points hand such conditions to a
//! [`FatalReporter`], which never returns.

use std::error::Error;
use std::fmt;

use crate::error::ZoneError;

/// A fatal zone error together with the entry point that raised it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FatalError {
    /// Name of the zone operation that failed (e.g. `"free"`).
    pub context: &'static str,
    /// What went wrong.
    pub error: ZoneError,
}

impl FatalError {
    /// Pair an error with the operation that raised it.
    pub fn new(context: &'static str, error: ZoneError) -> Self {
        Self { context, error }
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.error)
    }
}

impl Error for FatalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Outbound hook invoked on unrecoverable zone errors.
///
/// Implementations must not return. They must also not call back into
/// the zone that raised the error.
pub trait FatalReporter {
    /// Report `fatal` and terminate.
    fn report(&self, fatal: FatalError) -> !;
}

/// Logs the error, prints it to stderr and exits with status 1.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExitReporter;

impl FatalReporter for ExitReporter {
    fn report(&self, fatal: FatalError) -> ! {
        tracing::error!(context = fatal.context, error = %fatal.error, "fatal zone error");
        eprintln!("{fatal}");
        std::process::exit(1)
    }
}

/// Unwinds with the [`FatalError`] as the panic payload.
///
/// Lets embedders (and test suites) recover the error with
/// [`std::panic::catch_unwind`] and `downcast::<FatalError>()`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PanicReporter;

impl FatalReporter for PanicReporter {
    fn report(&self, fatal: FatalError) -> ! {
        tracing::error!(context = fatal.context, error = %fatal.error, "fatal zone error");
        std::panic::panic_any(fatal)
    }
}
