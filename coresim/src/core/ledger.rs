//! Grace-period quarantine policy.
//!
//! The ledger holds the monitor's authoritative success counters and the
//! quarantine list. A fault quarantines a core only while its counter is
//! strictly below the threshold; once a core has earned `threshold` credits
//! it is exempt for the rest of the run.

use std::collections::BTreeMap;

use crate::core::types::{CoreId, TaskOutcome};

/// Default number of successes a core needs before faults are tolerated.
pub const DEFAULT_QUARANTINE_THRESHOLD: u64 = 3;

/// What the ledger decided for one observed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Success counted; carries the updated counter.
    Credited { successes: u64 },
    /// Fault under the threshold on an active core. The caller must stop it.
    Quarantine { successes: u64 },
    /// Fault after the core earned its grace credits.
    FaultTolerated { successes: u64 },
    /// Fault on a core that is already quarantined.
    AlreadyQuarantined,
}

/// Success counters and quarantine list for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantineLedger {
    threshold: u64,
    counters: BTreeMap<CoreId, u64>,
    quarantined: Vec<CoreId>,
}

impl QuarantineLedger {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            counters: BTreeMap::new(),
            quarantined: Vec::new(),
        }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Replace the grace threshold. Applies to faults observed from now on;
    /// existing quarantine entries stay.
    pub fn set_threshold(&mut self, threshold: u64) {
        self.threshold = threshold;
    }

    /// Apply one registry observation to the counters and quarantine list.
    pub fn observe(&mut self, core: CoreId, outcome: TaskOutcome) -> Verdict {
        let successes = self.counters.entry(core).or_insert(0);
        match outcome {
            TaskOutcome::Success(_) => {
                *successes += 1;
                Verdict::Credited {
                    successes: *successes,
                }
            }
            TaskOutcome::Fault => {
                let successes = *successes;
                if self.quarantined.contains(&core) {
                    Verdict::AlreadyQuarantined
                } else if successes < self.threshold {
                    self.quarantined.push(core);
                    Verdict::Quarantine { successes }
                } else {
                    Verdict::FaultTolerated { successes }
                }
            }
        }
    }

    pub fn successes(&self, core: CoreId) -> Option<u64> {
        self.counters.get(&core).copied()
    }

    pub fn counters(&self) -> &BTreeMap<CoreId, u64> {
        &self.counters
    }

    /// Quarantined cores in the order they were quarantined.
    pub fn quarantined(&self) -> &[CoreId] {
        &self.quarantined
    }

    pub fn is_quarantined(&self, core: CoreId) -> bool {
        self.quarantined.contains(&core)
    }

    /// Drop all counters and quarantine entries, keeping the threshold.
    pub fn clear(&mut self) {
        self.counters.clear();
        self.quarantined.clear();
    }
}
