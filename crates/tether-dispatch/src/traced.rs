use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tether_stack::{StackSnapshot, TargetId};
use tracing::trace;

use crate::handoff::HandoffRecord;
use crate::{Dispatch, Scheduler};

pub(crate) struct Target<S> {
    pub(crate) id: TargetId,
    pub(crate) label: String,
    pub(crate) scheduler: S,
}

/// A scheduling target whose submissions carry their submitter's stack.
///
/// Mirrors the submission primitives one-for-one: closure forms
/// ([`spawn`](Self::spawn), [`spawn_barrier`](Self::spawn_barrier),
/// [`spawn_after`](Self::spawn_after)) and function-pointer-plus-context forms
/// (the `_f` variants). Ordering and delivery are exactly those of the wrapped
/// scheduler.
///
/// Cloning is cheap and every clone is the same target.
pub struct Traced<S> {
    inner: Arc<Target<S>>,
}

impl<S> Clone for Traced<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> fmt::Debug for Traced<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traced")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .finish()
    }
}

impl<S: Scheduler> Traced<S> {
    pub fn new(label: impl Into<String>, scheduler: S) -> Self {
        Self {
            inner: Arc::new(Target {
                id: TargetId::next(),
                label: label.into(),
                scheduler,
            }),
        }
    }

    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn scheduler(&self) -> &S {
        &self.inner.scheduler
    }

    // ── Closure forms ───────────────────────────────────────

    #[inline(never)]
    pub fn spawn<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let snapshot = StackSnapshot::capture(1);
        self.submit(Dispatch::Async, snapshot, work);
    }

    #[inline(never)]
    pub fn spawn_barrier<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let snapshot = StackSnapshot::capture(1);
        self.submit(Dispatch::Barrier, snapshot, work);
    }

    #[inline(never)]
    pub fn spawn_after<F>(&self, delay: Duration, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let snapshot = StackSnapshot::capture(1);
        self.submit(Dispatch::After(delay), snapshot, work);
    }

    // ── Function-pointer forms ──────────────────────────────

    #[inline(never)]
    pub fn spawn_f<C>(&self, context: C, work: fn(C))
    where
        C: Send + 'static,
    {
        let snapshot = StackSnapshot::capture(1);
        self.submit_f(Dispatch::Async, snapshot, context, work);
    }

    #[inline(never)]
    pub fn spawn_barrier_f<C>(&self, context: C, work: fn(C))
    where
        C: Send + 'static,
    {
        let snapshot = StackSnapshot::capture(1);
        self.submit_f(Dispatch::Barrier, snapshot, context, work);
    }

    #[inline(never)]
    pub fn spawn_after_f<C>(&self, delay: Duration, context: C, work: fn(C))
    where
        C: Send + 'static,
    {
        let snapshot = StackSnapshot::capture(1);
        self.submit_f(Dispatch::After(delay), snapshot, context, work);
    }

    // ── Handoff ─────────────────────────────────────────────

    fn submit<F>(&self, kind: Dispatch, snapshot: StackSnapshot, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        trace!(target_label = %self.inner.label, ?kind, frames = snapshot.frames().len(), "submitting");
        let record = HandoffRecord::new(Arc::clone(&self.inner), snapshot, work);
        self.inner.scheduler.dispatch(kind, record.into_job());
    }

    fn submit_f<C>(&self, kind: Dispatch, snapshot: StackSnapshot, context: C, work: fn(C))
    where
        C: Send + 'static,
    {
        trace!(target_label = %self.inner.label, ?kind, frames = snapshot.frames().len(), "submitting (fn)");
        let record = HandoffRecord::new(Arc::clone(&self.inner), snapshot, move || work(context));
        let (context, trampoline) = record.into_context();
        self.inner.scheduler.dispatch_f(kind, context, trampoline);
    }
}
