//! Request id allocation for outbound frames

use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Upper bound of the random offset added to the millisecond seed
const SEED_JITTER: u64 = 1_000_000;

/// Monotonic request id generator
///
/// Seeded from the wall clock plus random jitter so that two clients started
/// in the same millisecond do not hand out the same ids. Every call to
/// [`next`](Self::next) bumps the counter by exactly one and returns the
/// post-increment value; the increment and read are a single atomic
/// operation.
#[derive(Debug)]
pub struct SequenceAllocator {
    counter: AtomicU64,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let jitter = rand::thread_rng().gen_range(0..SEED_JITTER);
        Self::starting_at(now_ms + jitter)
    }

    /// Allocator whose first id is `seed + 1`
    pub fn starting_at(seed: u64) -> Self {
        Self {
            counter: AtomicU64::new(seed),
        }
    }

    #[inline]
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Last id handed out (or the seed if none yet)
    #[inline]
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::new()
    }
}
