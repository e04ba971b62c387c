//! Run invariants checked over plain snapshots of the shared state.
//!
//! Each check returns human-readable violations; an empty list means the
//! invariant holds.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::types::{CompletionRecord, CoreId};

/// Quarantine list invariants:
/// - No core is quarantined twice
/// - Every quarantined core has its stop signal set
pub fn check_quarantine(quarantined: &[CoreId], stopped: &BTreeSet<CoreId>) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = BTreeSet::new();
    for core in quarantined {
        if !seen.insert(*core) {
            errors.push(format!("core {core} quarantined more than once"));
        }
        if !stopped.contains(core) {
            errors.push(format!("core {core} quarantined but its stop signal is unset"));
        }
    }
    errors
}

/// Every spawned core that terminated appears exactly once, and nothing
/// else appears.
pub fn check_completions(spawned: &[CoreId], completions: &[CompletionRecord]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut counts: BTreeMap<CoreId, usize> = BTreeMap::new();
    for record in completions {
        *counts.entry(record.core).or_default() += 1;
    }
    for core in spawned {
        match counts.get(core).copied().unwrap_or(0) {
            1 => {}
            0 => errors.push(format!("core {core} has no completion record")),
            n => errors.push(format!("core {core} has {n} completion records")),
        }
    }
    for core in counts.keys() {
        if !spawned.contains(core) {
            errors.push(format!("completion record for unknown core {core}"));
        }
    }
    errors
}

/// Counters present in `before` must still be present and not smaller in
/// `after`.
pub fn check_counters_monotonic(
    before: &BTreeMap<CoreId, u64>,
    after: &BTreeMap<CoreId, u64>,
) -> Vec<String> {
    before
        .iter()
        .filter_map(|(core, prev)| match after.get(core) {
            None => Some(format!("core {core}: counter disappeared")),
            Some(next) if next < prev => {
                Some(format!("core {core}: counter decreased {prev} -> {next}"))
            }
            Some(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(core: u32) -> CompletionRecord {
        CompletionRecord {
            core: CoreId(core),
            local_successes: 0,
        }
    }

    #[test]
    fn quarantine_reports_duplicates_and_running_cores() {
        let stopped = BTreeSet::from([CoreId(0)]);
        let errors = check_quarantine(&[CoreId(0), CoreId(0), CoreId(1)], &stopped);
        assert!(errors.iter().any(|err| err.contains("more than once")));
        assert!(errors.iter().any(|err| err.contains("core 1") && err.contains("unset")));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn completions_require_exactly_one_per_core() {
        let spawned = [CoreId(0), CoreId(1), CoreId(2)];
        let errors = check_completions(&spawned, &[record(0), record(0), record(2), record(7)]);
        assert!(errors.iter().any(|err| err.contains("core 0 has 2")));
        assert!(errors.iter().any(|err| err.contains("core 1 has no")));
        assert!(errors.iter().any(|err| err.contains("unknown core 7")));
        assert!(check_completions(&spawned, &[record(2), record(0), record(1)]).is_empty());
    }

    #[test]
    fn counters_must_not_decrease() {
        let before = BTreeMap::from([(CoreId(0), 3), (CoreId(1), 1)]);
        let after = BTreeMap::from([(CoreId(0), 2), (CoreId(2), 5)]);
        let errors = check_counters_monotonic(&before, &after);
        assert_eq!(errors.len(), 2);
        assert!(check_counters_monotonic(&after, &after).is_empty());
    }
}
