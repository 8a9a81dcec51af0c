pub use platform::{FATAL_SIGNALS, install_signal_handlers};

/// Name of a fatal signal number, `"signal"` for anything else.
pub fn signal_name(signal: i32) -> &'static str {
    FATAL_SIGNALS
        .iter()
        .find(|(number, _)| *number == signal)
        .map_or("signal", |(_, name)| *name)
}

// ── Unix: sigaction ──────────────────────────────────────

#[cfg(unix)]
mod platform {
    use std::sync::atomic::{AtomicBool, Ordering};

    use tether_stack::StackSnapshot;
    use tracing::debug;

    use super::signal_name;
    use crate::InstallError;
    use crate::emit::{emit, render_report};

    /// Signals that terminate the process and get a chain report first.
    ///
    /// SIGPIPE is listed but only instrumented when the process has not set
    /// it to `SIG_IGN`. Rust binaries ignore it by default, so in practice a
    /// broken pipe is reported only by hosts that restored its default action.
    pub const FATAL_SIGNALS: &[(i32, &str)] = &[
        (libc::SIGILL, "SIGILL"),
        (libc::SIGTRAP, "SIGTRAP"),
        (libc::SIGABRT, "SIGABRT"),
        (libc::SIGFPE, "SIGFPE"),
        (libc::SIGBUS, "SIGBUS"),
        (libc::SIGSEGV, "SIGSEGV"),
        (libc::SIGSYS, "SIGSYS"),
        (libc::SIGPIPE, "SIGPIPE"),
    ];

    /// No `SA_ONSTACK`: the alternate stack the Rust runtime gives each
    /// thread is too small to walk and symbolize a stack on. A fault that
    /// cannot run the handler on its own stack still dies with its signal.
    const HANDLER_FLAGS: libc::c_int = libc::SA_SIGINFO;

    static REPORTING: AtomicBool = AtomicBool::new(false);

    /// Install the reporting handler for every signal in [`FATAL_SIGNALS`].
    ///
    /// Signals the process currently ignores stay ignored. The Rust runtime
    /// ignores SIGPIPE, and reporting on it would turn a failed write into a
    /// crash.
    pub fn install_signal_handlers() -> Result<(), InstallError> {
        for &(signal, name) in FATAL_SIGNALS {
            let failed = || InstallError::Sigaction {
                signal: name,
                errno: last_errno(),
            };

            // SAFETY: a zeroed sigaction is a valid out-parameter.
            let mut previous: libc::sigaction = unsafe { std::mem::zeroed() };
            // SAFETY: querying only; no handler is changed.
            if unsafe { libc::sigaction(signal, std::ptr::null(), &mut previous) } != 0 {
                return Err(failed());
            }
            if previous.sa_sigaction == libc::SIG_IGN {
                debug!(signal = name, "signal is ignored by the process, leaving it alone");
                continue;
            }

            // SAFETY: the handler only touches process-global state through
            // atomics and async-signal-safe calls, apart from the documented
            // best-effort report.
            unsafe {
                let mut action: libc::sigaction = std::mem::zeroed();
                action.sa_sigaction = fault_handler as *const () as usize;
                action.sa_flags = HANDLER_FLAGS;
                libc::sigemptyset(&mut action.sa_mask);
                if libc::sigaction(signal, &action, std::ptr::null_mut()) != 0 {
                    return Err(failed());
                }
            }
            debug!(signal = name, "installed fault handler");
        }
        Ok(())
    }

    fn last_errno() -> i32 {
        std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
    }

    extern "C" fn fault_handler(
        signal: libc::c_int,
        _info: *mut libc::siginfo_t,
        _context: *mut libc::c_void,
    ) {
        // One report per process death; a fault raised while reporting goes
        // straight to the default action.
        if !REPORTING.swap(true, Ordering::SeqCst) {
            let chain = StackSnapshot::capture(1);
            let headline = format!("fatal signal {}", signal_name(signal));
            emit(&render_report(&headline, &chain));
        }

        // SAFETY: sigaction and raise are async-signal-safe. The signal is
        // blocked while this handler runs, so the raised one is delivered
        // with the default disposition as soon as the handler returns.
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = libc::SIG_DFL;
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signal, &action, std::ptr::null_mut());
            libc::raise(signal);
        }
    }
}

// ── Other targets ────────────────────────────────────────

#[cfg(not(unix))]
mod platform {
    use crate::InstallError;

    pub const FATAL_SIGNALS: &[(i32, &str)] = &[];

    pub fn install_signal_handlers() -> Result<(), InstallError> {
        Err(InstallError::UnsupportedPlatform {
            target_os: std::env::consts::OS,
        })
    }
}
