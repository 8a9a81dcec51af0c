//! Stack snapshots that stay linked across asynchronous handoffs.
//!
//! A [`StackSnapshot`] is the calling thread's stack at one instant, plus an
//! optional link to the snapshot taken where the current work was submitted.
//! Following those links yields the causal chain of a piece of work across
//! every scheduler hop it took.
//!
//! The [`bridge`] module holds the per-thread association table that lets a
//! resumed job find the snapshot its submitter left behind.

pub mod bridge;
mod frame;
mod snapshot;
mod walk;

pub use bridge::{Association, TargetId};
pub use frame::Frame;
pub use snapshot::{ASYNC_MARKER, Chain, StackSnapshot};
pub use walk::{CaptureOptions, capture_frames};
