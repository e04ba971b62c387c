//! Clock abstraction for the two suspension points of the simulation: the
//! worker's inter-task delay and the monitor's poll interval.
//!
//! Production code sleeps on the wall clock. Tests swap in a clock that
//! returns immediately so the whole protocol runs without real time passing.

use std::thread;
use std::time::Duration;

/// Blocking sleep source shared by workers and the monitor.
pub trait Clock: Send + Sync + 'static {
    fn sleep(&self, duration: Duration);
}

/// Wall-clock sleeps via [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
