pub mod fatal_signal;
pub mod job_panic;
pub mod nested_handoff;

use tether::{TokioScheduler, Traced};
use tokio::runtime::Handle;

pub(crate) type Queue = Traced<TokioScheduler>;

pub(crate) fn queue(label: &str, handle: &Handle) -> Queue {
    Traced::new(label, TokioScheduler::new(handle.clone()))
}
