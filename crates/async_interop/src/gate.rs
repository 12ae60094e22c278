use std::sync::atomic::{AtomicBool, Ordering};

/// Atomic claim flag that lets exactly one caller through.
#[derive(Debug, Default)]
pub struct OneShotGate {
    claimed: AtomicBool,
}

impl OneShotGate {
    pub const fn new() -> Self {
        Self {
            claimed: AtomicBool::new(false),
        }
    }

    /// Claims the gate. Only the first caller ever receives `true`.
    pub fn try_claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[cfg(test)]
    fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}
