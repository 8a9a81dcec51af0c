//! Thread-keyed association table between scheduling targets and snapshots.
//!
//! While a handed-off job runs, its submitter's snapshot is associated with
//! (target, executing thread). Captures taken on that thread link to it.
//!
//! The table lives in thread-local storage, so the thread half of the key is
//! always the calling thread and unrelated threads never contend. Each key
//! holds a stack rather than a single slot: re-entering the same target on
//! the same thread shadows the outer association, and the outer one becomes
//! visible again when the inner [`Association`] is dropped.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::StackSnapshot;

/// Identity of one scheduling target (queue, executor, pool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(NonZeroU64);

static NEXT_TARGET_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

impl TargetId {
    /// Mint a process-unique id.
    pub fn next() -> Self {
        let raw = NEXT_TARGET_ID.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(raw).expect("invariant violated: target id counter wrapped"))
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

struct Entry {
    target: TargetId,
    token: u64,
    snapshot: Arc<StackSnapshot>,
}

thread_local! {
    static ACTIVE: RefCell<Vec<Entry>> = const { RefCell::new(Vec::new()) };
}

/// Scoped association; dropping it clears the entry it created.
///
/// Not `Send`: the entry lives in the table of the thread that created it.
#[must_use = "the association is cleared as soon as the guard is dropped"]
pub struct Association {
    target: TargetId,
    token: u64,
    _thread_bound: PhantomData<*const ()>,
}

impl Association {
    pub fn target(&self) -> TargetId {
        self.target
    }

    /// Clear now rather than at end of scope.
    pub fn clear(self) {}
}

impl Drop for Association {
    fn drop(&mut self) {
        let token = self.token;
        // The table may already be gone during thread teardown.
        let _ = ACTIVE.try_with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|e| e.token == token) {
                active.remove(pos);
            }
        });
    }
}

/// Make `snapshot` the current association for `target` on this thread.
pub fn associate(target: TargetId, snapshot: Arc<StackSnapshot>) -> Association {
    let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    ACTIVE.with(|active| {
        active.borrow_mut().push(Entry {
            target,
            token,
            snapshot,
        });
    });
    Association {
        target,
        token,
        _thread_bound: PhantomData,
    }
}

/// The innermost snapshot associated with `target` on this thread.
pub fn lookup(target: TargetId) -> Option<Arc<StackSnapshot>> {
    read(|active| {
        active
            .iter()
            .rev()
            .find(|e| e.target == target)
            .map(|e| Arc::clone(&e.snapshot))
    })
}

/// The innermost snapshot on this thread, whichever target it belongs to.
pub fn current() -> Option<Arc<StackSnapshot>> {
    read(|active| active.last().map(|e| Arc::clone(&e.snapshot)))
}

/// The target whose job this thread is currently running, if any.
pub fn current_target() -> Option<TargetId> {
    read(|active| active.last().map(|e| e.target))
}

/// Run `f` with `snapshot` associated to `target`, clearing afterwards even
/// if `f` unwinds.
pub fn scope<R>(target: TargetId, snapshot: Arc<StackSnapshot>, f: impl FnOnce() -> R) -> R {
    let _association = associate(target, snapshot);
    f()
}

// A fault handler may interrupt this thread while the table is being
// mutated; such a read sees an empty table instead of panicking.
fn read<R>(f: impl FnOnce(&[Entry]) -> Option<R>) -> Option<R> {
    ACTIVE
        .try_with(|active| match active.try_borrow() {
            Ok(active) => f(&active),
            Err(_) => None,
        })
        .ok()
        .flatten()
}
