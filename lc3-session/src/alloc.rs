//! Where session state blocks come from and go back to.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use lc3_transform::StateBlock;

/// Source of state blocks. A session returns its block to the allocator
/// that produced it, never to another one.
pub trait StateAllocator: Send + Sync {
    /// A zeroed block of exactly `bytes`, or `None` on exhaustion.
    fn acquire(&self, bytes: usize) -> Option<StateBlock>;
    fn release(&self, block: StateBlock);
}

/// Fallible heap allocation.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator;

impl StateAllocator for HeapAllocator {
    fn acquire(&self, bytes: usize) -> Option<StateBlock> {
        StateBlock::try_zeroed(bytes)
    }

    fn release(&self, block: StateBlock) {
        drop(block)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocStats {
    pub acquired: usize,
    pub released: usize,
    pub failed: usize,
    /// Blocks handed back that this allocator never issued.
    pub foreign: usize,
    pub live: usize,
    pub live_bytes: usize,
}

/// Bookkeeping wrapper around another allocator, with failure injection.
#[derive(Debug, Default)]
pub struct TrackingAllocator<A = HeapAllocator> {
    inner: A,
    fail_budget: AtomicUsize,
    stats: Mutex<Tracked>,
}

#[derive(Debug, Default)]
struct Tracked {
    stats: AllocStats,
    issued: HashSet<usize>,
}

impl TrackingAllocator<HeapAllocator> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A: StateAllocator> TrackingAllocator<A> {
    pub fn wrap(inner: A) -> Self {
        Self {
            inner,
            fail_budget: AtomicUsize::new(0),
            stats: Mutex::default(),
        }
    }

    /// Makes the next `count` acquisitions fail.
    pub fn fail_next(&self, count: usize) {
        self.fail_budget.store(count, Ordering::SeqCst);
    }

    pub fn stats(&self) -> AllocStats {
        self.tracked().stats
    }

    fn tracked(&self) -> std::sync::MutexGuard<'_, Tracked> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_failure(&self) -> bool {
        self.fail_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl<A: StateAllocator> StateAllocator for TrackingAllocator<A> {
    fn acquire(&self, bytes: usize) -> Option<StateBlock> {
        let block = if self.take_failure() {
            None
        } else {
            self.inner.acquire(bytes)
        };

        let mut tracked = self.tracked();
        match block {
            Some(block) => {
                tracked.issued.insert(block.as_ptr() as usize);
                tracked.stats.acquired += 1;
                tracked.stats.live += 1;
                tracked.stats.live_bytes += block.len_bytes();
                Some(block)
            }
            None => {
                tracked.stats.failed += 1;
                None
            }
        }
    }

    fn release(&self, block: StateBlock) {
        let mut tracked = self.tracked();
        if tracked.issued.remove(&(block.as_ptr() as usize)) {
            tracked.stats.released += 1;
            tracked.stats.live -= 1;
            tracked.stats.live_bytes -= block.len_bytes();
        } else {
            tracked.stats.foreign += 1;
        }
        drop(tracked);
        self.inner.release(block);
    }
}
