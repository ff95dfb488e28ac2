//! Scoped keep-alive held while an upload cycle runs.
//!
//! On platforms that suspend aggressively the host must be kept awake until
//! the retry loop finishes. [`KeepAliveGuard`] acquires on creation and
//! releases on drop, so every exit path of the loop (success, failure,
//! early return, panic unwinding) releases.

use tracing::trace;

/// Something that can keep the host from suspending
pub trait KeepAlive: Send + Sync {
    fn acquire(&self);
    fn release(&self);
}

/// Keep-alive for hosts that never suspend mid-task
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopKeepAlive;

impl KeepAlive for NoopKeepAlive {
    fn acquire(&self) {
        trace!("keep-alive acquired");
    }

    fn release(&self) {
        trace!("keep-alive released");
    }
}

/// Holds a [`KeepAlive`] until dropped
pub struct KeepAliveGuard<'a> {
    keep_alive: &'a dyn KeepAlive,
}

impl<'a> KeepAliveGuard<'a> {
    pub fn acquire(keep_alive: &'a dyn KeepAlive) -> Self {
        keep_alive.acquire();
        Self { keep_alive }
    }
}

impl Drop for KeepAliveGuard<'_> {
    fn drop(&mut self) {
        self.keep_alive.release();
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts acquire/release calls
    #[derive(Clone, Default)]
    pub struct CountingKeepAlive {
        pub acquired: Arc<AtomicUsize>,
        pub released: Arc<AtomicUsize>,
    }

    impl CountingKeepAlive {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn acquired(&self) -> usize {
            self.acquired.load(Ordering::SeqCst)
        }

        pub fn released(&self) -> usize {
            self.released.load(Ordering::SeqCst)
        }
    }

    impl KeepAlive for CountingKeepAlive {
        fn acquire(&self) {
            self.acquired.fetch_add(1, Ordering::SeqCst);
        }

        fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}
