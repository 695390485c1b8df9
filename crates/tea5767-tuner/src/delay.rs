//! Delay providers for the settle intervals between transactions

use std::time::Duration;

use embedded_hal::delay::DelayNs;

/// Sleeps the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(us as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }
}

/// Returns immediately and adds up the time it was asked to wait
///
/// Lets simulations and tests run at full speed while still checking how
/// long the real device would have been waited on.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedDelay {
    elapsed_ns: u64,
}

impl SimulatedDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requested delay
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns)
    }
}

impl DelayNs for SimulatedDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns = self.elapsed_ns.saturating_add(ns as u64);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ns = self
            .elapsed_ns
            .saturating_add(ms as u64 * 1_000_000);
    }
}
