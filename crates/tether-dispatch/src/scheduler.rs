use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

/// A unit of deferred work in closure form.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Opaque context handed to a [`WorkFn`].
pub type Context = Box<dyn Any + Send + 'static>;

/// Deferred work in function-pointer form; receives its context when run.
pub type WorkFn = fn(Context);

/// Which submission primitive to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Run as soon as the scheduler allows, concurrently with other work.
    Async,
    /// Run after every earlier submission has finished; later submissions
    /// wait for it.
    Barrier,
    /// Become eligible to run once the delay has elapsed.
    After(Duration),
}

/// The scheduling capability that [`Traced`](crate::Traced) instruments.
///
/// Implementations decide threads, ordering and timing. A job dropped without
/// being run counts as cancelled.
pub trait Scheduler: Send + Sync + 'static {
    fn dispatch(&self, kind: Dispatch, job: Job);

    /// Function-pointer form. Schedulers with a native context-passing entry
    /// point override this; the default boxes the call into a [`Job`].
    fn dispatch_f(&self, kind: Dispatch, context: Context, work: WorkFn) {
        self.dispatch(kind, Box::new(move || work(context)));
    }
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn dispatch(&self, kind: Dispatch, job: Job) {
        (**self).dispatch(kind, job)
    }

    fn dispatch_f(&self, kind: Dispatch, context: Context, work: WorkFn) {
        (**self).dispatch_f(kind, context, work)
    }
}
