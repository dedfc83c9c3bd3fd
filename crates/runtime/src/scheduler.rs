use tracing::trace;

/// Opaque id of a requested animation frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub u64);

/// Host capability for requesting animation frames.
///
/// The host calls back into the requester's `tick` when the frame fires.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Tracks the single outstanding frame request of a loop.
///
/// Requesting while one is pending replaces it; the stale handle is
/// cancelled first so the host never fires two ticks for one loop.
#[derive(Debug, Default, Clone)]
pub struct FrameLoop {
    pending: Option<FrameHandle>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }

    pub fn schedule(&mut self, scheduler: &mut impl FrameScheduler) -> FrameHandle {
        if let Some(stale) = self.pending.take() {
            scheduler.cancel_frame(stale);
        }
        let handle = scheduler.request_frame();
        trace!(handle = handle.0, "frame requested");
        self.pending = Some(handle);
        handle
    }

    /// Marks the pending frame as delivered.
    ///
    /// Returns false for a handle this loop no longer waits on.
    pub fn fired(&mut self, handle: FrameHandle) -> bool {
        if self.pending == Some(handle) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self, scheduler: &mut impl FrameScheduler) {
        if let Some(handle) = self.pending.take() {
            trace!(handle = handle.0, "frame cancelled");
            scheduler.cancel_frame(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameHandle, FrameLoop, FrameScheduler};

    #[derive(Default)]
    struct Recorder {
        next: u64,
        live: Vec<FrameHandle>,
        cancelled: Vec<FrameHandle>,
    }

    impl FrameScheduler for Recorder {
        fn request_frame(&mut self) -> FrameHandle {
            self.next += 1;
            let h = FrameHandle(self.next);
            self.live.push(h);
            h
        }

        fn cancel_frame(&mut self, handle: FrameHandle) {
            self.live.retain(|h| *h != handle);
            self.cancelled.push(handle);
        }
    }

    #[test]
    fn schedule_keeps_one_outstanding_request() {
        let mut sched = Recorder::default();
        let mut lp = FrameLoop::new();
        let a = lp.schedule(&mut sched);
        let b = lp.schedule(&mut sched);
        assert_ne!(a, b);
        assert_eq!(sched.live, vec![b]);
        assert_eq!(sched.cancelled, vec![a]);
    }

    #[test]
    fn fired_ignores_stale_handles() {
        let mut sched = Recorder::default();
        let mut lp = FrameLoop::new();
        let a = lp.schedule(&mut sched);
        assert!(!lp.fired(FrameHandle(a.0 + 10)));
        assert!(lp.fired(a));
        assert!(!lp.is_scheduled());
    }

    #[test]
    fn cancel_releases_pending_frame() {
        let mut sched = Recorder::default();
        let mut lp = FrameLoop::new();
        let a = lp.schedule(&mut sched);
        lp.cancel(&mut sched);
        lp.cancel(&mut sched);
        assert_eq!(sched.cancelled, vec![a]);
        assert!(sched.live.is_empty());
    }
}
