use std::fmt;
use std::sync::Arc;

use crate::walk::{CaptureOptions, capture_frames};
use crate::{Frame, bridge};

/// Separator printed between one hop of a chain and the hop that submitted it.
pub const ASYNC_MARKER: &str = "…asynchronously invoked from:";

/// The frames of one thread at one instant, linked to the snapshot taken
/// where the running work was submitted.
///
/// Snapshots are immutable once built. A predecessor always predates its
/// successor, so chains cannot form cycles.
pub struct StackSnapshot {
    frames: Vec<Frame>,
    predecessor: Option<Arc<StackSnapshot>>,
}

impl StackSnapshot {
    pub fn new(frames: Vec<Frame>, predecessor: Option<Arc<StackSnapshot>>) -> Self {
        Self {
            frames,
            predecessor,
        }
    }

    /// Capture the calling thread's stack and link it to whatever snapshot is
    /// associated with the work this thread is currently running.
    ///
    /// `skip` drops that many callers beyond the caller of `capture`; with
    /// `skip = 0` the first frame is the function that called `capture`.
    /// Never fails: a skip deeper than the stack yields no frames.
    #[inline(never)]
    pub fn capture(skip: usize) -> StackSnapshot {
        let frames = capture_frames(CaptureOptions::skip(skip.saturating_add(1)));
        StackSnapshot {
            frames,
            predecessor: bridge::current(),
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn predecessor(&self) -> Option<&Arc<StackSnapshot>> {
        self.predecessor.as_ref()
    }

    /// This snapshot followed by each predecessor, ending at the root.
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// Number of snapshots in the chain, counting this one.
    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    /// Render the whole chain: newest hop first, root last, hops separated by
    /// [`ASYNC_MARKER`].
    pub fn format(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StackSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (hop, snapshot) in self.chain().enumerate() {
            if hop > 0 {
                writeln!(f, "{ASYNC_MARKER}")?;
            }
            if snapshot.frames.is_empty() {
                writeln!(f, "      <no frames>")?;
            }
            for (index, frame) in snapshot.frames.iter().enumerate() {
                writeln!(f, "{index:>4}: {}", frame.text())?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for StackSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackSnapshot")
            .field("frames", &self.frames.len())
            .field("depth", &self.depth())
            .finish()
    }
}

impl Drop for StackSnapshot {
    fn drop(&mut self) {
        // Unlink iteratively; the default recursive drop would use one stack
        // frame per hop.
        let mut next = self.predecessor.take();
        while let Some(snapshot) = next {
            next = match Arc::into_inner(snapshot) {
                Some(mut owned) => owned.predecessor.take(),
                None => None,
            };
        }
    }
}

pub struct Chain<'a> {
    next: Option<&'a StackSnapshot>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a StackSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.predecessor.as_deref();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(labels: &[&str], predecessor: Option<Arc<StackSnapshot>>) -> StackSnapshot {
        let frames = labels
            .iter()
            .enumerate()
            .map(|(i, label)| Frame::with_text(0x1000 + i, *label))
            .collect();
        StackSnapshot::new(frames, predecessor)
    }

    #[test]
    fn capture_outside_any_target_has_no_predecessor() {
        let snap = StackSnapshot::capture(0);
        assert!(snap.predecessor().is_none());
        assert_eq!(snap.depth(), 1);
        assert!(!snap.frames().is_empty());
    }

    #[test]
    fn capture_with_huge_skip_is_empty_not_a_fault() {
        let snap = StackSnapshot::capture(usize::MAX);
        assert!(snap.frames().is_empty());
        assert_eq!(snap.format(), "      <no frames>\n");
    }

    #[test]
    fn format_lists_newest_hop_first_and_root_last() {
        let root = Arc::new(snapshot(&["main", "start"], None));
        let middle = Arc::new(snapshot(&["submit_b"], Some(root)));
        let newest = snapshot(&["crash_site", "task_b"], Some(middle));

        let expected = format!(
            "   0: crash_site\n   1: task_b\n{ASYNC_MARKER}\n   0: submit_b\n{ASYNC_MARKER}\n   0: main\n   1: start\n"
        );
        assert_eq!(newest.format(), expected);
        assert_eq!(newest.to_string(), expected);
        assert_eq!(newest.depth(), 3);
    }

    #[test]
    fn chain_walks_predecessors_in_order() {
        let root = Arc::new(snapshot(&["root"], None));
        let leaf = snapshot(&["leaf"], Some(Arc::clone(&root)));

        let firsts: Vec<&str> = leaf.chain().map(|s| s.frames()[0].text()).collect();
        assert_eq!(firsts, ["leaf", "root"]);
        assert!(Arc::ptr_eq(leaf.predecessor().unwrap(), &root));
    }

    #[test]
    fn dropping_a_very_long_chain_does_not_recurse() {
        let mut head: Option<Arc<StackSnapshot>> = None;
        for _ in 0..200_000 {
            head = Some(Arc::new(StackSnapshot::new(Vec::new(), head)));
        }
        drop(head);
    }

    #[test]
    fn shared_predecessor_survives_one_successor_dropping() {
        let root = Arc::new(snapshot(&["root"], None));
        let a = snapshot(&["a"], Some(Arc::clone(&root)));
        let b = snapshot(&["b"], Some(Arc::clone(&root)));
        drop(a);
        assert_eq!(b.depth(), 2);
        assert_eq!(Arc::strong_count(&root), 2);
    }
}
