//! Fault-detection and quarantine coordinator.
//!
//! The monitor is the only reader of the registry and the only writer of the
//! success counters and quarantine list. Each poll it snapshots the registry,
//! feeds every entry through the [`QuarantineLedger`] and sets the stop signal
//! of any core the ledger quarantines. It never blocks on workers and never
//! writes the registry.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;

use tracing::{debug, info, instrument, trace, warn};

use crate::core::ledger::{DEFAULT_QUARANTINE_THRESHOLD, QuarantineLedger, Verdict};
use crate::core::types::CoreId;
use crate::io::clock::Clock;
use crate::shared::registry::ResultRegistry;
use crate::shared::signal::{EndSignal, PauseGate, StopSignals};

/// Polling cadence and grace threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorParams {
    pub poll_interval: Duration,
    pub quarantine_threshold: u64,
}

impl Default for MonitorParams {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            quarantine_threshold: DEFAULT_QUARANTINE_THRESHOLD,
        }
    }
}

/// Counters and quarantine list shared between the monitor (writer) and any
/// number of readers.
#[derive(Debug, Clone)]
pub struct MonitorState {
    ledger: Arc<RwLock<QuarantineLedger>>,
}

impl MonitorState {
    pub fn new(threshold: u64) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(QuarantineLedger::new(threshold))),
        }
    }

    /// Copy of the success counters.
    pub fn counters(&self) -> BTreeMap<CoreId, u64> {
        self.read(|ledger| ledger.counters().clone())
    }

    pub fn successes(&self, core: CoreId) -> Option<u64> {
        self.read(|ledger| ledger.successes(core))
    }

    /// Quarantined cores in quarantine order.
    pub fn quarantined(&self) -> Vec<CoreId> {
        self.read(|ledger| ledger.quarantined().to_vec())
    }

    pub fn is_quarantined(&self, core: CoreId) -> bool {
        self.read(|ledger| ledger.is_quarantined(core))
    }

    pub fn threshold(&self) -> u64 {
        self.read(QuarantineLedger::threshold)
    }

    fn read<T>(&self, f: impl FnOnce(&QuarantineLedger) -> T) -> T {
        f(&self.ledger.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write(&self) -> RwLockWriteGuard<'_, QuarantineLedger> {
        self.ledger.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_threshold(&self, threshold: u64) {
        self.write().set_threshold(threshold);
    }

    /// Drop counters and quarantine entries. Only valid between runs.
    pub(crate) fn clear(&self) {
        self.write().clear();
    }
}

/// Lifecycle of a monitor within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    Active,
    Ended,
}

/// What a single poll did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Registry entries evaluated this poll.
    pub observed: usize,
    /// Cores quarantined by this poll, in evaluation order.
    pub quarantined: Vec<CoreId>,
    /// Whether the end signal is set after this poll.
    pub ended: bool,
}

/// Shared handles the monitor reads from and writes to.
#[derive(Debug)]
pub struct MonitorContext<C> {
    pub registry: ResultRegistry,
    pub state: MonitorState,
    pub pause: PauseGate,
    pub clock: Arc<C>,
}

/// Periodic supervisor for one run.
#[derive(Debug)]
pub struct Monitor<C> {
    stops: StopSignals,
    end: EndSignal,
    params: MonitorParams,
    ctx: MonitorContext<C>,
}

impl<C: Clock> Monitor<C> {
    /// The ledger behind `ctx.state` adopts `params.quarantine_threshold`.
    pub fn new(
        stops: StopSignals,
        end: EndSignal,
        params: MonitorParams,
        ctx: MonitorContext<C>,
    ) -> Self {
        ctx.state.set_threshold(params.quarantine_threshold);
        Self {
            stops,
            end,
            params,
            ctx,
        }
    }

    pub fn phase(&self) -> MonitorPhase {
        if self.end.is_set() {
            MonitorPhase::Ended
        } else {
            MonitorPhase::Active
        }
    }

    /// Evaluate the current registry snapshot once.
    ///
    /// Cores without a registry entry are skipped. Sets the end signal when
    /// every stop signal is set.
    pub fn poll_once(&mut self) -> PollReport {
        let snapshot = self.ctx.registry.snapshot();
        let mut report = PollReport {
            observed: snapshot.len(),
            ..PollReport::default()
        };

        {
            // Stop signals are set under the write lock so readers never see a
            // quarantined core that is still running.
            let mut ledger = self.ctx.state.write();
            for (core, outcome) in snapshot {
                match ledger.observe(core, outcome) {
                    Verdict::Quarantine { successes } => {
                        info!(core = %core, successes, "fault before grace threshold, quarantining core");
                        match self.stops.get(core) {
                            Some(stop) => {
                                stop.set();
                            }
                            None => warn!(core = %core, "quarantined core has no stop signal"),
                        }
                        report.quarantined.push(core);
                    }
                    Verdict::FaultTolerated { successes } => {
                        debug!(core = %core, successes, "fault tolerated past grace threshold");
                    }
                    Verdict::Credited { successes } => {
                        trace!(core = %core, successes, "success credited");
                    }
                    Verdict::AlreadyQuarantined => {}
                }
            }
        }

        if self.stops.all_set() && self.end.set() {
            info!("all cores stopped, ending simulation");
        }
        report.ended = self.end.is_set();
        report
    }

    /// Poll until the end signal is set, sleeping the poll interval between
    /// polls. Returns the number of polls performed.
    ///
    /// Blocking; meant for a dedicated thread.
    #[instrument(skip_all, fields(cores = self.stops.len()))]
    pub fn run(mut self) -> u64 {
        info!(
            poll_interval_ms = self.params.poll_interval.as_millis() as u64,
            threshold = self.params.quarantine_threshold,
            "monitor started"
        );
        let mut polls = 0u64;
        while !self.end.is_set() {
            let end = &self.end;
            self.ctx.pause.wait_while_paused(|| end.is_set());
            if self.end.is_set() {
                break;
            }
            let report = self.poll_once();
            polls += 1;
            if report.ended {
                break;
            }
            self.ctx.clock.sleep(self.params.poll_interval);
        }
        info!(polls, "monitor ended");
        polls
    }
}
