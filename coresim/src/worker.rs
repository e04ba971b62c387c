//! Simulated core: sample an outcome, publish it, sleep, repeat until told to
//! stop.

use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, instrument, trace, warn};

use crate::core::sampler::OutcomeSampler;
use crate::core::types::{CompletionRecord, CoreId, TaskOutcome};
use crate::io::clock::Clock;
use crate::io::spawn::{Spawner, worker_thread_name};
use crate::shared::completion::CompletionLog;
use crate::shared::registry::ResultRegistry;
use crate::shared::signal::{PauseGate, StopSignal};

/// Outcome of a single worker cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// The stop signal was observed at loop top; nothing was sampled.
    Stopped,
    /// A task ran and its outcome was published.
    Ran(TaskOutcome),
}

/// Shared handles a worker publishes into.
#[derive(Debug)]
pub struct WorkerContext<C> {
    pub registry: ResultRegistry,
    pub completions: CompletionLog,
    pub pause: PauseGate,
    pub clock: Arc<C>,
}

impl<C> Clone for WorkerContext<C> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            completions: self.completions.clone(),
            pause: self.pause.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// One simulated core.
pub struct CoreWorker<S, C> {
    id: CoreId,
    sampler: S,
    stop: StopSignal,
    ctx: WorkerContext<C>,
    local_successes: u64,
}

impl<S: OutcomeSampler, C: Clock> CoreWorker<S, C> {
    /// Create a worker with a fresh stop signal.
    pub fn new(id: CoreId, sampler: S, ctx: WorkerContext<C>) -> Self {
        Self {
            id,
            sampler,
            stop: StopSignal::new(),
            ctx,
            local_successes: 0,
        }
    }

    pub fn id(&self) -> CoreId {
        self.id
    }

    /// Handle to this worker's stop signal.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Request a stop. Idempotent; takes effect at the next loop top.
    pub fn stop(&self) {
        self.stop.set();
    }

    pub fn local_successes(&self) -> u64 {
        self.local_successes
    }

    /// Run one cycle without the trailing delay.
    ///
    /// Blocks while the fleet is paused, then checks the stop signal. If it
    /// is unset, samples one outcome and publishes it to the registry.
    pub fn run_cycle(&mut self) -> Cycle {
        let stop = &self.stop;
        self.ctx.pause.wait_while_paused(|| stop.is_set());
        if self.stop.is_set() {
            return Cycle::Stopped;
        }
        let outcome = self.sampler.sample_outcome();
        self.ctx.registry.set(self.id, outcome);
        if !outcome.is_fault() {
            self.local_successes += 1;
        }
        trace!(core = %self.id, ?outcome, "task finished");
        Cycle::Ran(outcome)
    }

    /// Loop until the stop signal is observed, then record completion.
    #[instrument(skip_all, fields(core = %self.id))]
    pub fn run(mut self) -> CompletionRecord {
        debug!("worker started");
        while let Cycle::Ran(_) = self.run_cycle() {
            let delay = self.sampler.sample_delay();
            self.ctx.clock.sleep(delay);
        }
        self.finish()
    }

    /// Append this worker's completion record. Consumes the worker so the
    /// record is written exactly once.
    pub fn finish(self) -> CompletionRecord {
        let record = CompletionRecord {
            core: self.id,
            local_successes: self.local_successes,
        };
        self.ctx.completions.record(record);
        debug!(core = %self.id, local_successes = self.local_successes, "worker finished");
        record
    }
}

impl<S, C> CoreWorker<S, C>
where
    S: OutcomeSampler + 'static,
    C: Clock,
{
    /// Start the worker loop on its own thread.
    pub fn spawn<P: Spawner>(self, spawner: &P) -> std::io::Result<WorkerHandle> {
        let id = self.id;
        let stop = self.stop_signal();
        let join = spawner.spawn(worker_thread_name(id), move || self.run())?;
        Ok(WorkerHandle { id, stop, join })
    }
}

/// Handle to a running worker thread.
#[derive(Debug)]
pub struct WorkerHandle {
    id: CoreId,
    stop: StopSignal,
    join: JoinHandle<CompletionRecord>,
}

impl WorkerHandle {
    pub fn id(&self) -> CoreId {
        self.id
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Request a stop. Safe to call concurrently with the running loop.
    pub fn stop(&self) {
        self.stop.set();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the worker to exit. Returns `None` if its thread panicked.
    pub fn join(self) -> Option<CompletionRecord> {
        match self.join.join() {
            Ok(record) => Some(record),
            Err(_) => {
                warn!(core = %self.id, "worker thread panicked");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::io::spawn::ThreadSpawner;
    use crate::test_support::{InstantClock, ScriptedSampler, worker_context};

    fn worker(outcomes: Vec<TaskOutcome>) -> CoreWorker<ScriptedSampler, InstantClock> {
        CoreWorker::new(
            CoreId(0),
            ScriptedSampler::new(outcomes),
            worker_context(InstantClock::new()),
        )
    }

    #[test]
    fn cycle_publishes_outcome_and_counts_successes() {
        let mut worker = worker(vec![TaskOutcome::Success(4), TaskOutcome::Fault]);
        assert_eq!(worker.run_cycle(), Cycle::Ran(TaskOutcome::Success(4)));
        assert_eq!(
            worker.ctx.registry.get(CoreId(0)),
            Some(TaskOutcome::Success(4))
        );
        assert_eq!(worker.run_cycle(), Cycle::Ran(TaskOutcome::Fault));
        assert_eq!(worker.ctx.registry.get(CoreId(0)), Some(TaskOutcome::Fault));
        assert_eq!(worker.local_successes(), 1);
    }

    #[test]
    fn stopped_worker_samples_nothing() {
        let mut worker = worker(vec![TaskOutcome::Success(1)]);
        worker.stop();
        worker.stop();
        assert_eq!(worker.run_cycle(), Cycle::Stopped);
        assert!(worker.ctx.registry.is_empty());
    }

    #[test]
    fn finish_records_completion_once() {
        let mut worker = worker(vec![TaskOutcome::Success(1), TaskOutcome::Success(2)]);
        let completions = worker.ctx.completions.clone();
        worker.run_cycle();
        worker.run_cycle();
        let record = worker.finish();
        assert_eq!(record.local_successes, 2);
        assert_eq!(completions.entries(), vec![record]);
    }

    #[test]
    fn run_sleeps_between_tasks_until_stopped() {
        let clock = InstantClock::new();
        let ctx = worker_context(clock.clone());
        let sampler = ScriptedSampler::new(vec![TaskOutcome::Success(1)])
            .with_delay(Duration::from_millis(5))
            .stop_after(3);
        let worker = CoreWorker::new(CoreId(2), sampler.clone(), ctx.clone());
        sampler.bind_stop(worker.stop_signal());

        let record = worker.run();
        assert_eq!(record.local_successes, 3);
        assert_eq!(sampler.drawn(), 3);
        assert_eq!(clock.sleeps(), 3);
        assert_eq!(clock.virtual_elapsed(), Duration::from_millis(15));
        assert_eq!(ctx.completions.entries(), vec![record]);
    }

    #[test]
    fn spawned_worker_stops_on_request() {
        let ctx = worker_context(InstantClock::new());
        let worker = CoreWorker::new(
            CoreId(1),
            ScriptedSampler::new(vec![TaskOutcome::Success(9)]),
            ctx.clone(),
        );
        let handle = worker.spawn(&ThreadSpawner).expect("spawn");
        assert_eq!(handle.id(), CoreId(1));
        handle.stop();
        let record = handle.join().expect("record");
        assert_eq!(ctx.completions.entries(), vec![record]);
    }
}
