//! Cooperative cancellation and pause primitives.
//!
//! Workers check their [`StopSignal`] once per cycle at loop top; nothing is
//! ever interrupted preemptively.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::core::types::CoreId;

/// Upper bound on how long a paused thread sleeps before rechecking its
/// cancellation condition.
const PAUSE_RECHECK: Duration = Duration::from_millis(50);

/// Per-core stop flag. Cloning shares the flag.
///
/// Setting is idempotent: only the first `set` reports a transition, later
/// calls are no-ops.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Returns `true` if this call moved it from unset to set.
    pub fn set(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Stop signals for every spawned core, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct StopSignals(BTreeMap<CoreId, StopSignal>);

impl StopSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, core: CoreId, signal: StopSignal) {
        self.0.insert(core, signal);
    }

    pub fn get(&self, core: CoreId) -> Option<&StopSignal> {
        self.0.get(&core)
    }

    /// True when every signal is set. An empty set counts as all stopped.
    pub fn all_set(&self) -> bool {
        self.0.values().all(StopSignal::is_set)
    }

    /// Set every signal; returns how many transitioned.
    pub fn set_all(&self) -> usize {
        self.0.values().filter(|signal| signal.set()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CoreId, &StopSignal)> {
        self.0.iter().map(|(core, signal)| (*core, signal))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Default)]
struct FlagInner {
    set: Mutex<bool>,
    changed: Condvar,
}

/// Run-wide end flag that can be waited on with a timeout.
#[derive(Debug, Clone, Default)]
pub struct EndSignal(Arc<FlagInner>);

impl EndSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake all waiters. Returns `true` on the first set.
    pub fn set(&self) -> bool {
        let mut set = self.0.set.lock().unwrap_or_else(PoisonError::into_inner);
        let transitioned = !*set;
        *set = true;
        self.0.changed.notify_all();
        transitioned
    }

    pub fn is_set(&self) -> bool {
        *self.0.set.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the flag is set or `timeout` elapses. Returns whether it
    /// is set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.0.set.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .0
            .changed
            .wait_timeout_while(guard, timeout, |set| !*set)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    /// Unset the flag between runs.
    pub fn clear(&self) {
        *self.0.set.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }
}

/// Fleet-wide pause switch shared by workers and the monitor.
#[derive(Debug, Clone, Default)]
pub struct PauseGate(Arc<FlagInner>);

impl PauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        *self.0.set.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }

    pub fn resume(&self) {
        let mut paused = self.0.set.lock().unwrap_or_else(PoisonError::into_inner);
        *paused = false;
        self.0.changed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        *self.0.set.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block while paused, returning early once `cancelled` reports true.
    pub fn wait_while_paused(&self, cancelled: impl Fn() -> bool) {
        let mut paused = self.0.set.lock().unwrap_or_else(PoisonError::into_inner);
        while *paused && !cancelled() {
            paused = self
                .0
                .changed
                .wait_timeout(paused, PAUSE_RECHECK)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn stop_signal_reports_only_first_transition() {
        let signal = StopSignal::new();
        let shared = signal.clone();
        assert!(!signal.is_set());
        assert!(signal.set());
        assert!(!shared.set());
        assert!(shared.is_set());
    }

    #[test]
    fn concurrent_stops_transition_exactly_once() {
        let signal = StopSignal::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let signal = signal.clone();
                thread::spawn(move || signal.set())
            })
            .collect();
        let transitions = handles
            .into_iter()
            .map(|handle| handle.join().expect("join"))
            .filter(|transitioned| *transitioned)
            .count();
        assert_eq!(transitions, 1);
    }

    #[test]
    fn all_set_requires_every_core() {
        let mut signals = StopSignals::new();
        signals.insert(CoreId(0), StopSignal::new());
        signals.insert(CoreId(1), StopSignal::new());
        signals.get(CoreId(0)).expect("core 0").set();
        assert!(!signals.all_set());
        assert_eq!(signals.set_all(), 1);
        assert!(signals.all_set());
    }

    #[test]
    fn end_signal_wakes_waiter() {
        let end = EndSignal::new();
        let setter = end.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            setter.set();
        });
        assert!(end.wait_timeout(Duration::from_secs(5)));
        handle.join().expect("join");
    }

    #[test]
    fn end_signal_wait_times_out_and_clears() {
        let end = EndSignal::new();
        assert!(!end.wait_timeout(Duration::from_millis(10)));
        assert!(end.set());
        assert!(!end.set());
        end.clear();
        assert!(!end.is_set());
    }

    #[test]
    fn pause_gate_releases_on_resume() {
        let gate = PauseGate::new();
        gate.pause();
        let resumer = gate.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            resumer.resume();
        });
        gate.wait_while_paused(|| false);
        assert!(!gate.is_paused());
        handle.join().expect("join");
    }

    #[test]
    fn pause_gate_releases_on_cancel() {
        let gate = PauseGate::new();
        gate.pause();
        let stop = StopSignal::new();
        stop.set();
        gate.wait_while_paused(|| stop.is_set());
        assert!(gate.is_paused());
    }
}
