use std::num::NonZeroUsize;

use crate::Frame;

#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    pub max_frames: NonZeroUsize,
    pub skip_frames: usize,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            max_frames: NonZeroUsize::new(256)
                .expect("invariant violated: default max_frames must be non-zero"),
            skip_frames: 0,
        }
    }
}

impl CaptureOptions {
    pub fn skip(skip_frames: usize) -> Self {
        Self {
            skip_frames,
            ..Self::default()
        }
    }
}

/// Walk the calling thread's stack, innermost frame first.
///
/// Frames belonging to the unwinder and to this function are never reported:
/// the first frame returned is the caller of `capture_frames`, unless
/// `skip_frames` drops more. Skipping past the end yields an empty list.
#[inline(never)]
pub fn capture_frames(options: CaptureOptions) -> Vec<Frame> {
    let anchor = capture_frames as *const () as usize;
    let mut walked: Vec<(usize, usize)> = Vec::with_capacity(64);
    let mut anchor_at = None;
    let limit = options.max_frames.get();

    backtrace::trace(|frame| {
        let symbol = frame.symbol_address() as usize;
        if anchor_at.is_none() && symbol == anchor {
            anchor_at = Some(walked.len());
        }
        walked.push((frame.ip() as usize, symbol));
        // Before the anchor is found we cannot tell how many frames are ours,
        // so only start counting toward the limit after it.
        match anchor_at {
            Some(at) => walked.len() - at - 1 < limit.saturating_add(options.skip_frames),
            None => walked.len() < limit.saturating_add(options.skip_frames).saturating_add(64),
        }
    });

    // Unwinders that cannot report symbol addresses leave the anchor unknown;
    // fall back to reporting from the innermost frame.
    let start = anchor_at.map_or(0, |at| at + 1);

    walked
        .into_iter()
        .skip(start)
        .skip(options.skip_frames)
        .take(limit)
        .filter(|(ip, _)| *ip != 0)
        .map(|(ip, _)| Frame::new(ip))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[inline(never)]
    fn capture_pair() -> (Vec<Frame>, Vec<Frame>) {
        let with_self = capture_frames(CaptureOptions::skip(0));
        let without_self = capture_frames(CaptureOptions::skip(1));
        (with_self, without_self)
    }

    #[test]
    fn skipping_one_drops_exactly_the_innermost_frame() {
        let (with_self, without_self) = capture_pair();
        assert!(!without_self.is_empty());
        assert_eq!(with_self.len(), without_self.len() + 1);
        assert_eq!(&with_self[1..], &without_self[..]);
    }

    #[test]
    fn skip_past_the_end_is_empty() {
        let frames = capture_frames(CaptureOptions::skip(100_000));
        assert!(frames.is_empty());

        let frames = capture_frames(CaptureOptions::skip(usize::MAX));
        assert!(frames.is_empty());
    }

    #[test]
    fn max_frames_bounds_the_result() {
        let options = CaptureOptions {
            max_frames: NonZeroUsize::new(2).unwrap(),
            skip_frames: 0,
        };
        assert!(capture_frames(options).len() <= 2);
    }

    #[test]
    fn innermost_frame_is_the_caller() {
        #[inline(never)]
        fn distinctive_capture_site() -> Vec<Frame> {
            capture_frames(CaptureOptions::default())
        }
        let frames = distinctive_capture_site();
        assert!(
            frames[0].text().contains("distinctive_capture_site"),
            "innermost frame was {}",
            frames[0].text()
        );
    }
}
