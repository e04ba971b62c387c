//! Test-only helpers: scripted samplers, an instant clock, a spawner that
//! fails on demand and small fast configurations.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::core::sampler::OutcomeSampler;
use crate::core::types::{CoreId, TaskOutcome};
use crate::io::clock::Clock;
use crate::io::config::SimConfig;
use crate::io::spawn::{MONITOR_THREAD_NAME, Spawner, ThreadSpawner, worker_thread_name};
use crate::shared::completion::CompletionLog;
use crate::shared::registry::ResultRegistry;
use crate::shared::signal::{PauseGate, StopSignal};
use crate::worker::WorkerContext;

/// Clock whose sleeps return immediately, counting calls and virtual time.
///
/// Clones share counters.
#[derive(Debug, Clone, Default)]
pub struct InstantClock {
    sleeps: Arc<AtomicU64>,
    slept_nanos: Arc<AtomicU64>,
}

impl InstantClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `sleep` calls so far.
    pub fn sleeps(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }

    /// Sum of all requested sleep durations.
    pub fn virtual_elapsed(&self) -> Duration {
        Duration::from_nanos(self.slept_nanos.load(Ordering::SeqCst))
    }
}

impl Clock for InstantClock {
    fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.slept_nanos.fetch_add(nanos, Ordering::SeqCst);
        thread::yield_now();
    }
}

#[derive(Debug)]
struct Script {
    outcomes: Vec<TaskOutcome>,
    drawn: u64,
    stop_after: Option<u64>,
    stop: Option<StopSignal>,
}

/// Sampler that replays a fixed outcome script, repeating it forever.
///
/// Clones share the script position. With [`ScriptedSampler::stop_after`] and
/// [`ScriptedSampler::bind_stop`] it sets a stop signal once it has produced
/// the given number of outcomes.
#[derive(Debug, Clone)]
pub struct ScriptedSampler {
    script: Arc<Mutex<Script>>,
    delay: Duration,
}

impl ScriptedSampler {
    pub fn new(outcomes: Vec<TaskOutcome>) -> Self {
        assert!(!outcomes.is_empty(), "script must not be empty");
        Self {
            script: Arc::new(Mutex::new(Script {
                outcomes,
                drawn: 0,
                stop_after: None,
                stop: None,
            })),
            delay: Duration::from_millis(1),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn stop_after(self, outcomes: u64) -> Self {
        self.lock().stop_after = Some(outcomes);
        self
    }

    pub fn bind_stop(&self, stop: StopSignal) {
        self.lock().stop = Some(stop);
    }

    /// Outcomes produced so far.
    pub fn drawn(&self) -> u64 {
        self.lock().drawn
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OutcomeSampler for ScriptedSampler {
    fn sample_outcome(&mut self) -> TaskOutcome {
        let mut script = self.lock();
        let idx = (script.drawn % script.outcomes.len() as u64) as usize;
        let outcome = script.outcomes[idx];
        script.drawn += 1;
        if script.stop_after.is_some_and(|limit| script.drawn >= limit)
            && let Some(stop) = &script.stop
        {
            stop.set();
        }
        outcome
    }

    fn sample_delay(&mut self) -> Duration {
        self.delay
    }
}

/// Spawner that fails for the named threads and delegates otherwise.
#[derive(Debug, Clone, Default)]
pub struct FailingSpawner {
    failing: Vec<String>,
}

impl FailingSpawner {
    pub fn for_cores(cores: &[CoreId]) -> Self {
        Self {
            failing: cores.iter().copied().map(worker_thread_name).collect(),
        }
    }

    pub fn for_monitor() -> Self {
        Self {
            failing: vec![MONITOR_THREAD_NAME.to_string()],
        }
    }
}

impl Spawner for FailingSpawner {
    fn spawn<F, T>(&self, name: String, body: F) -> io::Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.failing.contains(&name) {
            return Err(io::Error::other(format!(
                "simulated thread exhaustion for {name}"
            )));
        }
        ThreadSpawner.spawn(name, body)
    }
}

/// Fresh shared handles for a worker under test.
pub fn worker_context<C: Clock>(clock: C) -> WorkerContext<C> {
    WorkerContext {
        registry: ResultRegistry::new(),
        completions: CompletionLog::new(),
        pause: PauseGate::new(),
        clock: Arc::new(clock),
    }
}

/// Valid config with millisecond timings and a fixed seed.
pub fn fast_config(core_count: usize) -> SimConfig {
    SimConfig {
        core_count,
        delay_range_secs: [0.001, 0.002],
        poll_interval_secs: 0.005,
        duration_secs: 0.2,
        seed: Some(42),
        ..SimConfig::default()
    }
}
