//! End-of-run statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::types::{CompletionRecord, CoreId};

/// Worker's own success count disagreeing with the monitor's counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub core: CoreId,
    pub local: u64,
    pub monitored: u64,
}

/// Final state of a run, as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Seed the run's samplers were derived from; `None` when the caller
    /// supplied its own samplers.
    pub seed: Option<u64>,
    /// Monitor's authoritative success counters.
    pub successes: BTreeMap<CoreId, u64>,
    /// Quarantined cores in quarantine order.
    pub quarantined: Vec<CoreId>,
    /// Completion records in termination order.
    pub completions: Vec<CompletionRecord>,
    pub total_quarantined: usize,
    /// Mean success counter over cores that were never quarantined.
    pub average_successful_tasks: f64,
    pub discrepancies: Vec<Discrepancy>,
}

impl RunSummary {
    pub fn new(
        seed: Option<u64>,
        successes: BTreeMap<CoreId, u64>,
        quarantined: Vec<CoreId>,
        completions: Vec<CompletionRecord>,
    ) -> Self {
        let average_successful_tasks = average_successful_tasks(&successes, &quarantined);
        let discrepancies = discrepancies(&successes, &completions);
        Self {
            seed,
            total_quarantined: quarantined.len(),
            successes,
            quarantined,
            completions,
            average_successful_tasks,
            discrepancies,
        }
    }

    /// Cores with a counter that were never quarantined.
    pub fn active_cores(&self) -> Vec<CoreId> {
        self.successes
            .keys()
            .filter(|core| !self.quarantined.contains(core))
            .copied()
            .collect()
    }
}

/// Average success counter over non-quarantined cores; `0.0` when there are
/// none. Quarantined cores are excluded even if they accrued successes.
pub fn average_successful_tasks(successes: &BTreeMap<CoreId, u64>, quarantined: &[CoreId]) -> f64 {
    let (total, count) = successes
        .iter()
        .filter(|(core, _)| !quarantined.contains(core))
        .fold((0u64, 0u64), |(total, count), (_, successes)| {
            (total + successes, count + 1)
        });
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

fn discrepancies(
    successes: &BTreeMap<CoreId, u64>,
    completions: &[CompletionRecord],
) -> Vec<Discrepancy> {
    completions
        .iter()
        .filter_map(|record| {
            let monitored = successes.get(&record.core).copied().unwrap_or(0);
            (monitored != record.local_successes).then_some(Discrepancy {
                core: record.core,
                local: record.local_successes,
                monitored,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_excludes_quarantined_cores() {
        let successes = BTreeMap::from([(CoreId(0), 4), (CoreId(1), 6), (CoreId(2), 100)]);
        let avg = average_successful_tasks(&successes, &[CoreId(2)]);
        assert!((avg - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn average_is_zero_without_active_cores() {
        let successes = BTreeMap::from([(CoreId(0), 2)]);
        assert_eq!(average_successful_tasks(&successes, &[CoreId(0)]), 0.0);
        assert_eq!(average_successful_tasks(&BTreeMap::new(), &[]), 0.0);
    }

    #[test]
    fn summary_reports_discrepancies_and_totals() {
        let summary = RunSummary::new(
            Some(7),
            BTreeMap::from([(CoreId(0), 5), (CoreId(1), 0)]),
            vec![CoreId(1)],
            vec![
                CompletionRecord {
                    core: CoreId(1),
                    local_successes: 0,
                },
                CompletionRecord {
                    core: CoreId(0),
                    local_successes: 3,
                },
            ],
        );
        assert_eq!(summary.total_quarantined, 1);
        assert_eq!(summary.active_cores(), vec![CoreId(0)]);
        assert_eq!(
            summary.discrepancies,
            vec![Discrepancy {
                core: CoreId(0),
                local: 3,
                monitored: 5
            }]
        );
    }

    #[test]
    fn summary_serializes_counters_by_core() {
        let summary = RunSummary::new(
            Some(1),
            BTreeMap::from([(CoreId(3), 2)]),
            Vec::new(),
            Vec::new(),
        );
        let json: serde_json::Value = serde_json::to_value(&summary).expect("serialize");
        assert_eq!(json["successes"]["3"], 2);
        assert_eq!(json["average_successful_tasks"], 2.0);
        assert_eq!(json["seed"], 1);

        let unseeded = RunSummary::new(None, BTreeMap::new(), Vec::new(), Vec::new());
        let json = serde_json::to_value(&unseeded).expect("serialize");
        assert!(json["seed"].is_null());
    }
}
