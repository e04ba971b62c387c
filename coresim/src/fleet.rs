//! Fleet orchestration: spawn the cores and the monitor, drive a run's
//! lifecycle and collect the final summary.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use crate::core::invariants::{check_completions, check_counters_monotonic, check_quarantine};
use crate::core::sampler::{OutcomeSampler, SeededSampler};
use crate::core::summary::RunSummary;
use crate::core::types::{CompletionRecord, CoreId};
use crate::error::{ConfigError, SimError, SpawnError, SpawnFailure};
use crate::io::clock::{Clock, SystemClock};
use crate::io::config::SimConfig;
use crate::io::spawn::{MONITOR_THREAD_NAME, Spawner, ThreadSpawner};
use crate::monitor::{Monitor, MonitorContext, MonitorParams, MonitorState};
use crate::shared::completion::CompletionLog;
use crate::shared::registry::ResultRegistry;
use crate::shared::signal::{EndSignal, PauseGate, StopSignals};
use crate::worker::{CoreWorker, WorkerContext, WorkerHandle};

/// Workers started by [`spawn_cores`].
#[derive(Debug)]
pub struct SpawnedCores {
    /// Stop signals of the cores that started.
    pub stops: StopSignals,
    pub workers: Vec<WorkerHandle>,
    /// Cores whose thread could not be started.
    pub failures: Vec<SpawnFailure>,
}

impl SpawnedCores {
    /// Stop and join every started worker.
    pub fn abort(self) {
        self.stops.set_all();
        for worker in self.workers {
            worker.join();
        }
    }
}

/// Spawn `count` workers with ids `0..count`, each on its own thread.
///
/// Spawn failures do not abort the remaining cores; they are returned so the
/// caller can decide whether to proceed with fewer cores.
pub fn spawn_cores<S, F, C, P>(
    count: usize,
    mut sampler_for: F,
    ctx: &WorkerContext<C>,
    spawner: &P,
) -> Result<SpawnedCores, ConfigError>
where
    S: OutcomeSampler + 'static,
    F: FnMut(CoreId) -> S,
    C: Clock,
    P: Spawner,
{
    if count == 0 {
        return Err(ConfigError::CoreCount);
    }
    let count = u32::try_from(count).map_err(|_| ConfigError::CoreCount)?;

    let mut spawned = SpawnedCores {
        stops: StopSignals::new(),
        workers: Vec::with_capacity(count as usize),
        failures: Vec::new(),
    };
    for id in (0..count).map(CoreId) {
        let worker = CoreWorker::new(id, sampler_for(id), ctx.clone());
        let stop = worker.stop_signal();
        match worker.spawn(spawner) {
            Ok(handle) => {
                spawned.stops.insert(id, stop);
                spawned.workers.push(handle);
            }
            Err(err) => {
                warn!(core = %id, err = %err, "failed to spawn worker thread");
                spawned.failures.push(SpawnFailure {
                    core: id,
                    reason: err.to_string(),
                });
            }
        }
    }
    debug!(
        started = spawned.workers.len(),
        failed = spawned.failures.len(),
        "cores spawned"
    );
    Ok(spawned)
}

struct ActiveRun {
    seed: Option<u64>,
    stops: StopSignals,
    workers: Vec<WorkerHandle>,
    monitor: JoinHandle<u64>,
}

/// Owns the shared state of a simulation and drives its runs.
///
/// Shared containers outlive individual runs so a presentation layer can keep
/// reading them after a run ends; [`Simulation::reset`] clears them.
pub struct Simulation<C = SystemClock, P = ThreadSpawner> {
    config: SimConfig,
    clock: Arc<C>,
    spawner: P,
    registry: ResultRegistry,
    state: MonitorState,
    completions: CompletionLog,
    pause: PauseGate,
    end: EndSignal,
    run: Option<ActiveRun>,
    /// Seed of the most recent run; `None` before the first run.
    last_run: Option<Option<u64>>,
}

impl Simulation {
    /// Simulation on the wall clock with OS threads.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        Self::with_runtime(config, SystemClock, ThreadSpawner)
    }
}

impl<C: Clock, P: Spawner> Simulation<C, P> {
    /// Simulation with an injected clock and thread spawner.
    pub fn with_runtime(config: SimConfig, clock: C, spawner: P) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = MonitorState::new(config.quarantine_threshold);
        Ok(Self {
            config,
            clock: Arc::new(clock),
            spawner,
            registry: ResultRegistry::new(),
            state,
            completions: CompletionLog::new(),
            pause: PauseGate::new(),
            end: EndSignal::new(),
            run: None,
            last_run: None,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Start a run with seeded random samplers. Returns the run seed.
    pub fn start(&mut self) -> Result<u64, SimError> {
        let model = self.config.fault_model()?;
        let seed = self.config.seed.unwrap_or_else(rand::random);
        self.launch(Some(seed), |core| SeededSampler::for_core(model, seed, core))?;
        Ok(seed)
    }

    /// Start a run with caller-provided samplers, one per core. The run is
    /// reported as unseeded.
    pub fn start_with<S, F>(&mut self, sampler_for: F) -> Result<(), SimError>
    where
        S: OutcomeSampler + 'static,
        F: FnMut(CoreId) -> S,
    {
        self.launch(None, sampler_for)
    }

    #[instrument(skip(self, sampler_for), fields(cores = self.config.core_count))]
    fn launch<S, F>(&mut self, seed: Option<u64>, sampler_for: F) -> Result<(), SimError>
    where
        S: OutcomeSampler + 'static,
        F: FnMut(CoreId) -> S,
    {
        if self.run.is_some() {
            return Err(SimError::AlreadyRunning);
        }
        let params = MonitorParams {
            poll_interval: self.config.poll_interval()?,
            quarantine_threshold: self.config.quarantine_threshold,
        };
        self.clear_shared();

        let spawned = spawn_cores(
            self.config.core_count,
            sampler_for,
            &self.worker_context(),
            &self.spawner,
        )?;
        if !spawned.failures.is_empty() {
            let failed: Vec<CoreId> = spawned.failures.iter().map(|f| f.core).collect();
            if !self.config.allow_partial_spawn || spawned.workers.is_empty() {
                warn!(?failed, "aborting run after spawn failure");
                let failures = spawned.failures.clone();
                spawned.abort();
                self.clear_shared();
                return Err(SpawnError { failures }.into());
            }
            warn!(
                ?failed,
                started = spawned.workers.len(),
                "continuing with the cores that started"
            );
        }

        let monitor = Monitor::new(
            spawned.stops.clone(),
            self.end.clone(),
            params,
            MonitorContext {
                registry: self.registry.clone(),
                state: self.state.clone(),
                pause: self.pause.clone(),
                clock: Arc::clone(&self.clock),
            },
        );
        let monitor = match self
            .spawner
            .spawn(MONITOR_THREAD_NAME.to_string(), move || monitor.run())
        {
            Ok(handle) => handle,
            Err(err) => {
                error!(err = %err, "failed to spawn monitor thread");
                spawned.abort();
                self.clear_shared();
                return Err(SimError::MonitorSpawn(err));
            }
        };

        info!(?seed, cores = spawned.workers.len(), "simulation started");
        self.last_run = Some(seed);
        self.run = Some(ActiveRun {
            seed,
            stops: spawned.stops,
            workers: spawned.workers,
            monitor,
        });
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Block until the run ends on its own or `timeout` elapses. Returns
    /// whether the end signal is set.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.end.wait_timeout(timeout)
    }

    /// Set every stop signal and the end signal, join all threads and return
    /// the final summary.
    #[instrument(skip_all)]
    pub fn stop_all(&mut self) -> Result<RunSummary, SimError> {
        let run = self.run.take().ok_or(SimError::NotRunning)?;
        let counters_before = self.state.counters();
        let newly_stopped = run.stops.set_all();
        self.end.set();
        info!(newly_stopped, "stopping simulation");

        let mut terminated = Vec::with_capacity(run.workers.len());
        for worker in run.workers {
            let id = worker.id();
            if worker.join().is_some() {
                terminated.push(id);
            }
        }
        match run.monitor.join() {
            Ok(polls) => debug!(polls, "monitor joined"),
            Err(_) => warn!("monitor thread panicked"),
        }

        self.verify_invariants(&run.stops, &terminated, &counters_before);
        let summary = self.summary_for(run.seed);
        info!(
            quarantined = summary.total_quarantined,
            average_successful_tasks = summary.average_successful_tasks,
            "simulation stopped"
        );
        Ok(summary)
    }

    /// Start, wait up to `duration` (or until every core has stopped), then
    /// stop everything.
    pub fn run_for(&mut self, duration: Duration) -> Result<RunSummary, SimError> {
        self.start()?;
        if self.wait(duration) {
            info!("all cores stopped before the duration elapsed");
        }
        self.stop_all()
    }

    /// [`Simulation::run_for`] with the configured duration.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        let duration = self.config.duration()?;
        self.run_for(duration)
    }

    /// Suspend every worker's sampling loop and the monitor's polling.
    /// Counters and stop signals are untouched.
    pub fn pause(&self) {
        self.pause.pause();
        info!("simulation paused");
    }

    pub fn resume(&self) {
        self.pause.resume();
        info!("simulation resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    /// Clear counters, quarantine list, completion list and registry, and
    /// lift any pause.
    pub fn reset(&mut self) -> Result<(), SimError> {
        if self.run.is_some() {
            return Err(SimError::AlreadyRunning);
        }
        self.clear_shared();
        self.last_run = None;
        debug!("simulation state reset");
        Ok(())
    }

    pub fn registry(&self) -> &ResultRegistry {
        &self.registry
    }

    pub fn monitor_state(&self) -> &MonitorState {
        &self.state
    }

    pub fn end_signal(&self) -> &EndSignal {
        &self.end
    }

    /// Stop signals of the active run.
    pub fn stop_signals(&self) -> Option<&StopSignals> {
        self.run.as_ref().map(|run| &run.stops)
    }

    pub fn counters(&self) -> BTreeMap<CoreId, u64> {
        self.state.counters()
    }

    pub fn quarantined(&self) -> Vec<CoreId> {
        self.state.quarantined()
    }

    pub fn completions(&self) -> Vec<CompletionRecord> {
        self.completions.entries()
    }

    /// Summary of the current shared state, or `None` before the first run.
    pub fn summary(&self) -> Option<RunSummary> {
        self.last_run.map(|seed| self.summary_for(seed))
    }

    fn summary_for(&self, seed: Option<u64>) -> RunSummary {
        RunSummary::new(
            seed,
            self.state.counters(),
            self.state.quarantined(),
            self.completions.entries(),
        )
    }

    fn worker_context(&self) -> WorkerContext<C> {
        WorkerContext {
            registry: self.registry.clone(),
            completions: self.completions.clone(),
            pause: self.pause.clone(),
            clock: Arc::clone(&self.clock),
        }
    }

    fn clear_shared(&self) {
        self.registry.clear();
        self.state.clear();
        self.completions.clear();
        self.end.clear();
        self.pause.resume();
    }

    /// Check the end-of-run invariants against the joined state. Violations
    /// are logged and returned.
    fn verify_invariants(
        &self,
        stops: &StopSignals,
        terminated: &[CoreId],
        counters_before: &BTreeMap<CoreId, u64>,
    ) -> Vec<String> {
        let stopped: BTreeSet<CoreId> = stops
            .iter()
            .filter(|(_, signal)| signal.is_set())
            .map(|(core, _)| core)
            .collect();
        let mut violations = check_quarantine(&self.state.quarantined(), &stopped);
        violations.extend(check_completions(terminated, &self.completions.entries()));
        violations.extend(check_counters_monotonic(
            counters_before,
            &self.state.counters(),
        ));
        for violation in &violations {
            error!(%violation, "run invariant violated");
        }
        violations
    }
}

impl<C, P> Drop for Simulation<C, P> {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            run.stops.set_all();
            self.end.set();
            self.pause.resume();
        }
    }
}
