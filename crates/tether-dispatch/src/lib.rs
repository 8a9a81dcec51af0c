//! Instrumented submission onto schedulers.
//!
//! [`Traced`] sits between callers and a [`Scheduler`]. Every submission
//! captures the caller's stack, carries it to the worker thread inside the
//! handoff, and associates it there for the duration of the job, so stacks
//! captured inside the job link back to the submit site.
//!
//! ```rust,no_run
//! use tether_dispatch::{TokioScheduler, Traced};
//!
//! # fn demo(handle: tokio::runtime::Handle) {
//! let queue = Traced::new("ingest", TokioScheduler::new(handle));
//! let inner = queue.clone();
//! queue.spawn(move || {
//!     inner.spawn(|| {
//!         // a capture here has a chain of three hops
//!     });
//! });
//! # }
//! ```

mod handoff;
mod scheduler;
mod tokio_scheduler;
mod traced;

pub use scheduler::{Context, Dispatch, Job, Scheduler, WorkFn};
pub use tokio_scheduler::TokioScheduler;
pub use traced::Traced;
