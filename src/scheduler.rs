//! Cancellable next-frame scheduling.
//!
//! The render loop is not open-ended recursion: each frame consumes the due
//! handle and requests the next one, so at any instant at most one callback
//! is outstanding. Handles are generation-counted, which makes `cancel`
//! idempotent and safe against handles that already fired or were already
//! cancelled.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FrameHandle(u64);

#[derive(Debug, Default)]
pub(crate) struct FrameScheduler {
    next_id: u64,
    pending: Option<u64>,
}

impl FrameScheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Schedule the next frame. At most one request may be outstanding;
    /// callers cancel (or consume) the previous one first.
    pub(crate) fn request(&mut self) -> FrameHandle {
        debug_assert!(self.pending.is_none(), "frame already scheduled");
        self.next_id += 1;
        self.pending = Some(self.next_id);
        FrameHandle(self.next_id)
    }

    /// Cancel a scheduled frame. No-op if the handle already fired, was
    /// already cancelled, or belongs to an older generation.
    pub(crate) fn cancel(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle.0) {
            self.pending = None;
        }
    }

    /// Consume the pending frame, if any. The scheduler is empty afterwards;
    /// the frame body is responsible for rescheduling.
    pub(crate) fn take_due(&mut self) -> Option<FrameHandle> {
        self.pending.take().map(FrameHandle)
    }

    #[cfg(test)]
    pub(crate) fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_then_take_consumes() {
        let mut s = FrameScheduler::new();
        let h = s.request();
        assert!(s.has_pending());
        assert_eq!(s.take_due(), Some(h));
        assert!(!s.has_pending());
        assert_eq!(s.take_due(), None);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut s = FrameScheduler::new();
        let h = s.request();
        s.cancel(h);
        s.cancel(h);
        assert!(!s.has_pending());
    }

    #[test]
    fn cancel_of_fired_handle_is_safe() {
        let mut s = FrameScheduler::new();
        let h = s.request();
        assert!(s.take_due().is_some());
        s.cancel(h);
        assert!(!s.has_pending());
    }

    #[test]
    fn stale_cancel_cannot_kill_newer_request() {
        let mut s = FrameScheduler::new();
        let old = s.request();
        s.cancel(old);
        let new = s.request();
        s.cancel(old);
        assert!(s.has_pending());
        assert_eq!(s.take_due(), Some(new));
    }

    #[test]
    fn handles_are_unique_across_generations() {
        let mut s = FrameScheduler::new();
        let a = s.request();
        s.cancel(a);
        let b = s.request();
        assert_ne!(a, b);
    }
}
