//! Render requests from the configuration engine to the hosting application.

use std::sync::atomic::{AtomicBool, Ordering};

use maybe_sync::{MaybeSend, MaybeSync};

/// Receives requests to render the map again after its sources, layers or feature states
/// changed.
pub trait Messenger: MaybeSend + MaybeSync {
    /// Asks the application to render a new frame.
    fn request_render(&self);
}

/// Messenger forwarding at most one render request per frame.
///
/// A burst of state changes between two frames results in one request to the inner messenger.
/// The application calls [`CoalescingMessenger::frame_rendered`] once the frame is drawn.
#[derive(Debug)]
pub struct CoalescingMessenger<M: Messenger> {
    inner: M,
    scheduled: AtomicBool,
}

impl<M: Messenger> CoalescingMessenger<M> {
    /// Wraps the messenger.
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            scheduled: AtomicBool::new(false),
        }
    }

    /// Marks the pending frame as drawn, so that the next request is forwarded again.
    pub fn frame_rendered(&self) {
        self.scheduled.store(false, Ordering::Release);
    }

    /// Returns true if a render request was forwarded and the frame is not drawn yet.
    pub fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::Acquire)
    }
}

impl<M: Messenger> Messenger for CoalescingMessenger<M> {
    fn request_render(&self) {
        if !self.scheduled.swap(true, Ordering::AcqRel) {
            self.inner.request_render();
        }
    }
}

/// Messenger that drops all requests, for hosts that render continuously.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMessenger;

impl Messenger for NoMessenger {
    fn request_render(&self) {}
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use super::*;

    /// Counts render requests.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct CountingMessenger(pub Arc<AtomicUsize>);

    impl CountingMessenger {
        pub(crate) fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl Messenger for CountingMessenger {
        fn request_render(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn requests_are_coalesced_until_frame_is_drawn() {
        let counter = CountingMessenger::default();
        let messenger = CoalescingMessenger::new(counter.clone());

        messenger.request_render();
        messenger.request_render();
        assert_eq!(counter.count(), 1);
        assert!(messenger.is_scheduled());

        messenger.frame_rendered();
        assert!(!messenger.is_scheduled());

        messenger.request_render();
        assert_eq!(counter.count(), 2);
    }
}
