use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// The two buckets of a measured rate.
///
/// `current` accumulates events for the interval in progress, `last` holds
/// the frozen total of the most recently completed interval. Both are plain
/// atomics so the hot path never takes a lock.
#[derive(Debug, Default)]
pub struct BucketCounter {
    current: AtomicU64,
    last: AtomicU64,
}

impl BucketCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one event in the current interval.
    pub fn increment(&self) {
        self.current.fetch_add(1, Ordering::AcqRel);
    }

    /// Event count of the last completed interval.
    pub fn count(&self) -> u64 {
        self.last.load(Ordering::Acquire)
    }

    /// Events recorded so far in the interval still in progress.
    pub fn in_progress(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Freezes the current bucket into the last bucket and resets it.
    ///
    /// The exchange is a single atomic read-and-clear, so every increment
    /// lands either in the returned value or in the fresh current bucket.
    /// Callers must not run two swaps on the same counter concurrently.
    pub fn swap(&self) -> u64 {
        let frozen = self.current.swap(0, Ordering::AcqRel);
        self.last.store(frozen, Ordering::Release);
        frozen
    }

    pub fn reader(self: &Arc<Self>) -> RateReader {
        RateReader(Arc::clone(self))
    }
}

/// Read-only view of a [`BucketCounter`].
///
/// Cheap to clone; hand it to whatever consumes the rate so it can poll
/// without being able to record events or control the schedule.
#[derive(Debug, Clone)]
pub struct RateReader(Arc<BucketCounter>);

impl RateReader {
    pub fn count(&self) -> u64 {
        self.0.count()
    }
}
