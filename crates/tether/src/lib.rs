//! Causal call stacks across asynchronous handoffs.
//!
//! Submit work through a [`Traced`] scheduler instead of the scheduler
//! directly. Every submission records the submitting stack; every stack
//! captured while that work runs links back to it, hop after hop. With
//! `TETHER=fault-report` in the environment, [`init`] makes the process print
//! that chain when it dies on a fatal signal or a panic.
//!
//! ```rust,no_run
//! fn main() {
//!     // Once, early, before work is submitted.
//!     tether::init().expect("failed to install fault reporting");
//!
//!     let runtime = tokio::runtime::Runtime::new().unwrap();
//!     let queue = tether::Traced::new(
//!         "requests",
//!         tether::TokioScheduler::new(runtime.handle().clone()),
//!     );
//!     queue.spawn(|| tether::print_chain());
//!     # std::thread::sleep(std::time::Duration::from_millis(50));
//! }
//! ```
//!
//! # Initialization order
//!
//! [`init`] overrides whatever handlers are installed for the fatal signals
//! at the time it runs, so call it after any other library that installs
//! its own, and before submitting work. It is idempotent.

mod config;

use tracing::debug;

pub use config::{Config, ENV_VAR, FAULT_REPORT_MARKER, NO_PANIC_HOOK_MARKER, config};
pub use tether_dispatch::{Context, Dispatch, Job, Scheduler, TokioScheduler, Traced, WorkFn};
pub use tether_fault::{self as fault, InstallError};
pub use tether_stack::{
    ASYNC_MARKER, Association, CaptureOptions, Chain, Frame, StackSnapshot, TargetId, bridge,
};

/// Install fault reporting if the environment asks for it.
///
/// Without the marker nothing is installed and the process behaves exactly
/// as it would without this crate.
pub fn init() -> Result<(), InstallError> {
    let config = config();
    if !config.fault_report {
        debug!(env = ENV_VAR, "fault reporting not requested");
        return Ok(());
    }
    debug!(panic_hook = config.panic_hook, "installing fault reporting");
    if config.panic_hook {
        tether_fault::install()
    } else {
        tether_fault::install_signals_only()
    }
}

/// Print the chain leading to the caller to stderr.
#[inline(never)]
pub fn print_chain() {
    let chain = StackSnapshot::capture(1);
    tether_fault::emit(&tether_fault::render_report("chain requested", &chain));
}
