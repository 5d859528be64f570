//! Time sources for the scheduler

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic audio time in seconds
pub trait AudioClock {
    fn now(&self) -> f64;
}

impl<C: AudioClock + ?Sized> AudioClock for Arc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    bits: Arc<AtomicU64>,
}

impl VirtualClock {
    pub fn new(start: f64) -> Self {
        Self { bits: Arc::new(AtomicU64::new(start.to_bits())) }
    }

    pub fn set(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl AudioClock for VirtualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}
