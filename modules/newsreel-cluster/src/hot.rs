//! Atomically published thread index.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use newsreel_common::ThreadIndex;

/// Single-slot holder for the current [`ThreadIndex`], swapped atomically by
/// the clustering loop and read lock-free by request handlers. A reader's
/// handle stays valid for the duration of its query even if a new index is
/// published meanwhile; the old index is freed when its last reader drops
/// the handle.
pub struct HotIndex {
    inner: ArcSwap<ThreadIndex>,
    ready: AtomicBool,
}

impl Default for HotIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl HotIndex {
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::new(Arc::new(ThreadIndex::default())),
            ready: AtomicBool::new(false),
        }
    }

    /// Publish a new index generation. Subsequent loads return it; handles
    /// to the previous generation remain valid.
    pub fn publish(&self, index: ThreadIndex) {
        self.inner.store(Arc::new(index));
        self.ready.store(true, Ordering::Release);
    }

    /// Take a refcounted handle to the current index.
    pub fn load_full(&self) -> Arc<ThreadIndex> {
        self.inner.load_full()
    }

    /// False until the first successful publish; the frontend reports
    /// not-ready before then.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with_timestamp(iter_timestamp: u64) -> ThreadIndex {
        ThreadIndex {
            threads: Default::default(),
            iter_timestamp,
        }
    }

    #[test]
    fn not_ready_until_first_publish() {
        let hot = HotIndex::new();
        assert!(!hot.is_ready());
        hot.publish(index_with_timestamp(1));
        assert!(hot.is_ready());
    }

    #[test]
    fn readers_keep_their_generation_across_a_swap() {
        let hot = HotIndex::new();
        hot.publish(index_with_timestamp(1));

        let before = hot.load_full();
        hot.publish(index_with_timestamp(2));

        assert_eq!(before.iter_timestamp, 1, "old handle still sees generation 1");
        assert_eq!(hot.load_full().iter_timestamp, 2, "new loads see generation 2");
    }
}
