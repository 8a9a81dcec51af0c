use std::sync::Arc;

use tether_stack::{StackSnapshot, bridge};
use tracing::trace;

use crate::traced::Target;
use crate::{Context, Job, Scheduler, WorkFn};

/// Everything a submission carries from the submit site to the worker: the
/// target (kept alive until the job is done), the submitter's snapshot, and
/// the original work.
///
/// Owned by exactly one place at a time: the submitter, then the scheduler's
/// job or context, then `run`. Dropping it unrun (a cancelled job) never
/// touches the association table.
pub(crate) struct HandoffRecord<S, F> {
    target: Arc<Target<S>>,
    snapshot: Arc<StackSnapshot>,
    work: F,
}

impl<S, F> HandoffRecord<S, F>
where
    S: Scheduler,
    F: FnOnce() + Send + 'static,
{
    pub(crate) fn new(target: Arc<Target<S>>, snapshot: StackSnapshot, work: F) -> Self {
        Self {
            target,
            snapshot: Arc::new(snapshot),
            work,
        }
    }

    pub(crate) fn run(self) {
        let Self {
            target,
            snapshot,
            work,
        } = self;
        trace!(target_label = %target.label, target_id = %target.id, "running handoff");
        // Declared after `target`, so the association is cleared before the
        // target is released, on unwind too.
        let _association = bridge::associate(target.id, snapshot);
        work();
    }

    pub(crate) fn into_job(self) -> Job {
        Box::new(move || self.run())
    }

    /// Split into an opaque context and the trampoline that knows how to run it.
    pub(crate) fn into_context(self) -> (Context, WorkFn) {
        (Box::new(self), trampoline::<S, F>)
    }
}

fn trampoline<S, F>(context: Context)
where
    S: Scheduler,
    F: FnOnce() + Send + 'static,
{
    match context.downcast::<HandoffRecord<S, F>>() {
        Ok(record) => record.run(),
        Err(_) => panic!("invariant violated: handoff trampoline received a foreign context"),
    }
}
