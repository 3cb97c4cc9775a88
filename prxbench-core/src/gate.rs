use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Cooperative cancellation flag shared across a run.
///
/// Cancellation is observed between iterations only: requests already in
/// flight run to a terminal outcome and their proxy leases are released.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Hands out iteration slots to scenario workers.
///
/// `next()` is a single atomic claim, so exactly `iterations` slots are
/// handed out across any number of workers.
#[derive(Debug)]
pub struct IterationGate {
    counter: AtomicU64,
    iterations: u64,
    cancel: CancelToken,
}

impl IterationGate {
    #[must_use]
    pub fn new(iterations: u64, cancel: CancelToken) -> Self {
        Self {
            counter: AtomicU64::new(0),
            iterations,
            cancel,
        }
    }

    pub fn next(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.counter.fetch_add(1, Ordering::Relaxed) < self.iterations
    }
}
