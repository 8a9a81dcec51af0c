use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::{Dispatch, Job, Scheduler};

/// A concurrent queue on a Tokio runtime.
///
/// Async jobs are spawned as runtime tasks. A barrier job starts only after
/// every job enqueued before it has finished, and jobs enqueued after it wait
/// until it is done. Delayed jobs sleep on the runtime timer and are then
/// enqueued like async jobs, so a barrier submitted in the meantime still
/// orders them.
///
/// Jobs run inline on runtime worker threads and should not block for long.
#[derive(Clone)]
pub struct TokioScheduler {
    handle: Handle,
    state: Arc<Mutex<QueueState>>,
}

#[derive(Default)]
struct QueueState {
    /// Jobs enqueued since the last barrier.
    in_flight: Vec<JoinHandle<()>>,
    /// Opens when the most recent barrier job has finished.
    gate: Option<watch::Receiver<bool>>,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            state: Arc::new(Mutex::new(QueueState::default())),
        }
    }

    /// Scheduler on the runtime this thread is running in.
    ///
    /// Panics outside a Tokio runtime, like [`Handle::current`].
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    fn enqueue(&self, job: Job) {
        let mut state = self.state.lock();
        state.in_flight.retain(|task| !task.is_finished());
        let gate = state.gate.clone();
        let task = self.handle.spawn(async move {
            if let Some(gate) = gate {
                wait_open(gate).await;
            }
            job();
        });
        state.in_flight.push(task);
    }

    fn enqueue_barrier(&self, job: Job) {
        let mut state = self.state.lock();
        let earlier = std::mem::take(&mut state.in_flight);
        let previous_gate = state.gate.take();
        let (open, gate) = watch::channel(false);
        debug!(waiting_on = earlier.len(), "enqueueing barrier");

        self.handle.spawn(async move {
            if let Some(previous_gate) = previous_gate {
                wait_open(previous_gate).await;
            }
            for task in earlier {
                // A panicked job still counts as finished.
                let _ = task.await;
            }
            // If `job` panics, `open` is dropped and waiters proceed anyway.
            job();
            let _ = open.send(true);
        });
        state.gate = Some(gate);
    }

    fn enqueue_after(&self, delay: std::time::Duration, job: Job) {
        let this = self.clone();
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            this.enqueue(job);
        });
    }
}

async fn wait_open(mut gate: watch::Receiver<bool>) {
    // An error means the barrier job is gone (it panicked or was cancelled);
    // either way it no longer holds anything back.
    let _ = gate.wait_for(|open| *open).await;
}

impl Scheduler for TokioScheduler {
    fn dispatch(&self, kind: Dispatch, job: Job) {
        match kind {
            Dispatch::Async => self.enqueue(job),
            Dispatch::Barrier => self.enqueue_barrier(job),
            Dispatch::After(delay) => self.enqueue_after(delay, job),
        }
    }
}

impl std::fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TokioScheduler")
            .field("in_flight", &state.in_flight.len())
            .field("gated", &state.gate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Traced;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::{Duration, Instant};
    use tether_stack::StackSnapshot;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn barrier_waits_for_earlier_jobs_and_holds_back_later_ones() {
        let rt = runtime();
        let scheduler = TokioScheduler::new(rt.handle().clone());
        let finished_before = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel::<(&'static str, usize)>();

        for _ in 0..8 {
            let finished_before = Arc::clone(&finished_before);
            scheduler.dispatch(
                Dispatch::Async,
                Box::new(move || {
                    std::thread::sleep(Duration::from_millis(20));
                    finished_before.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        let barrier_tx = tx.clone();
        let seen = Arc::clone(&finished_before);
        scheduler.dispatch(
            Dispatch::Barrier,
            Box::new(move || {
                std::thread::sleep(Duration::from_millis(20));
                barrier_tx
                    .send(("barrier", seen.load(Ordering::SeqCst)))
                    .unwrap();
                seen.fetch_add(100, Ordering::SeqCst);
            }),
        );

        let seen = Arc::clone(&finished_before);
        scheduler.dispatch(
            Dispatch::Async,
            Box::new(move || {
                tx.send(("after", seen.load(Ordering::SeqCst))).unwrap();
            }),
        );

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first, ("barrier", 8));
        assert_eq!(second, ("after", 108));
    }

    #[test]
    fn panicking_barrier_does_not_wedge_the_queue() {
        let rt = runtime();
        let scheduler = TokioScheduler::new(rt.handle().clone());
        let (tx, rx) = mpsc::channel();

        scheduler.dispatch(Dispatch::Barrier, Box::new(|| panic!("barrier failed")));
        scheduler.dispatch(
            Dispatch::Async,
            Box::new(move || {
                tx.send(()).unwrap();
            }),
        );

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn delayed_job_waits_at_least_the_delay() {
        let rt = runtime();
        let scheduler = TokioScheduler::new(rt.handle().clone());
        let (tx, rx) = mpsc::channel();
        let submitted = Instant::now();

        scheduler.dispatch(
            Dispatch::After(Duration::from_millis(50)),
            Box::new(move || {
                tx.send(submitted.elapsed()).unwrap();
            }),
        );

        let elapsed = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(elapsed >= Duration::from_millis(50), "ran after {elapsed:?}");
    }

    #[test]
    fn chain_crosses_runtime_worker_threads() {
        let rt = runtime();
        let queue = Traced::new("tokio.chain", TokioScheduler::new(rt.handle().clone()));
        let (tx, rx) = mpsc::channel();

        let hop = queue.clone();
        queue.spawn(move || {
            let last = hop.clone();
            hop.spawn_after(Duration::from_millis(5), move || {
                last.spawn_barrier(move || {
                    tx.send(StackSnapshot::capture(0)).unwrap();
                });
            });
        });

        let inside = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(inside.depth(), 4);
        let root = inside.chain().last().unwrap();
        assert!(root.predecessor().is_none());
        assert!(!root.frames().is_empty());
    }

    #[test]
    fn reused_worker_sees_no_stale_predecessor() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let queue = Traced::new("tokio.reuse", TokioScheduler::new(rt.handle().clone()));
        let (tx, rx) = mpsc::channel();

        let first_tx = tx.clone();
        queue.spawn(move || {
            first_tx
                .send((std::thread::current().id(), StackSnapshot::capture(0).depth()))
                .unwrap();
        });
        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();

        queue.spawn(move || {
            tx.send((std::thread::current().id(), StackSnapshot::capture(0).depth()))
                .unwrap();
        });
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(first.0, second.0, "single worker runtime should reuse its thread");
        assert_eq!(first.1, 2);
        assert_eq!(second.1, 2);
    }
}
