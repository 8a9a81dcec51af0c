//! Print the causal chain when the process is about to die.
//!
//! [`install`] registers handlers for the fatal signals in [`FATAL_SIGNALS`]
//! and a panic hook. Each handler captures the current chain, writes it to
//! stderr in a single write, and then lets the fault proceed exactly as it
//! would have without instrumentation: signal handlers restore the default
//! disposition and re-raise, the panic hook defers to the hook it replaced.
//!
//! Reporting from a signal handler is best-effort. Stack walking, symbol
//! resolution and formatting all allocate, which is not async-signal-safe;
//! on a corrupted heap the report may be lost, but the process still dies
//! with its original signal.

mod emit;
mod error;
mod panic;
mod signal;

use std::sync::OnceLock;

use tracing::debug;

pub use emit::{emit, render_report};
pub use error::InstallError;
pub use panic::install_panic_hook;
pub use signal::{FATAL_SIGNALS, install_signal_handlers, signal_name};

static INSTALLED: OnceLock<Result<(), InstallError>> = OnceLock::new();

/// Install signal handlers and the panic hook, once per process.
///
/// Later calls return the outcome of the first one without reinstalling.
///
/// The panic hook is installed even when signal handlers cannot be, so
/// panics are still reported on targets without signals.
pub fn install() -> Result<(), InstallError> {
    INSTALLED
        .get_or_init(|| with_panic_hook(install_signal_handlers(), install_panic_hook))
        .clone()
}

fn with_panic_hook(
    signals: Result<(), InstallError>,
    install_hook: impl FnOnce(),
) -> Result<(), InstallError> {
    if let Err(error) = &signals {
        debug!(%error, "signal handlers not installed, panic hook only");
    }
    install_hook();
    signals
}

/// Install only the signal handlers, leaving panics to the default hook.
///
/// Shares the once-guard with [`install`]: whichever runs first decides.
pub fn install_signals_only() -> Result<(), InstallError> {
    INSTALLED.get_or_init(install_signal_handlers).clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_signal_install_still_installs_the_panic_hook() {
        let mut hooked = false;
        let result = with_panic_hook(
            Err(InstallError::UnsupportedPlatform { target_os: "plan9" }),
            || hooked = true,
        );
        assert!(hooked);
        assert_eq!(
            result,
            Err(InstallError::UnsupportedPlatform { target_os: "plan9" })
        );
    }

    #[test]
    fn successful_signal_install_installs_the_panic_hook() {
        let mut hooked = false;
        assert_eq!(with_panic_hook(Ok(()), || hooked = true), Ok(()));
        assert!(hooked);
    }
}
