use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of local logical time. Only differences between readings are meaningful.
pub trait Clock {
    fn now(&self) -> u64;
}

/// Shared tick counter advanced by whoever schedules the nodes.
///
/// Clones observe the same counter, so one driver can advance time for many nodes.
#[derive(Clone, Debug, Default)]
pub struct LogicalClock {
    ticks: Arc<AtomicU64>,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(tick: u64) -> Self {
        Self {
            ticks: Arc::new(AtomicU64::new(tick)),
        }
    }

    /// Move time forward by one tick and return the new reading
    pub fn advance(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn set(&self, tick: u64) {
        self.ticks.store(tick, Ordering::SeqCst);
    }
}

impl Clock for LogicalClock {
    fn now(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}
