//! Latest outcome per core.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::types::{CoreId, TaskOutcome};

/// Shared map of each core's most recent outcome.
///
/// Each worker writes only its own key; the monitor reads snapshots. Writes
/// are last-write-wins and no history is kept.
#[derive(Debug, Clone, Default)]
pub struct ResultRegistry {
    entries: Arc<RwLock<BTreeMap<CoreId, TaskOutcome>>>,
}

impl ResultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, core: CoreId, outcome: TaskOutcome) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(core, outcome);
    }

    pub fn get(&self, core: CoreId) -> Option<TaskOutcome> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&core)
            .copied()
    }

    /// Copy of every current entry, ordered by core id.
    pub fn snapshot(&self) -> Vec<(CoreId, TaskOutcome)> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(core, outcome)| (*core, *outcome))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry. Only valid between runs.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn set_is_last_write_wins() {
        let registry = ResultRegistry::new();
        registry.set(CoreId(0), TaskOutcome::Success(5));
        registry.set(CoreId(0), TaskOutcome::Fault);
        assert_eq!(registry.get(CoreId(0)), Some(TaskOutcome::Fault));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn missing_core_reads_as_absent() {
        let registry = ResultRegistry::new();
        assert_eq!(registry.get(CoreId(9)), None);
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn snapshot_is_ordered_and_detached() {
        let registry = ResultRegistry::new();
        registry.set(CoreId(2), TaskOutcome::Fault);
        registry.set(CoreId(0), TaskOutcome::Success(1));
        let snapshot = registry.snapshot();
        registry.set(CoreId(1), TaskOutcome::Success(3));
        assert_eq!(
            snapshot,
            vec![
                (CoreId(0), TaskOutcome::Success(1)),
                (CoreId(2), TaskOutcome::Fault),
            ]
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn concurrent_writers_keep_their_own_keys() {
        let registry = ResultRegistry::new();
        let handles: Vec<_> = (0..4u32)
            .map(|id| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for magnitude in 1..=50u8 {
                        registry.set(CoreId(id), TaskOutcome::Success(magnitude));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join");
        }
        for id in 0..4 {
            assert_eq!(registry.get(CoreId(id)), Some(TaskOutcome::Success(50)));
        }
    }

    #[test]
    fn clear_empties_registry() {
        let registry = ResultRegistry::new();
        registry.set(CoreId(0), TaskOutcome::Fault);
        registry.clear();
        assert!(registry.is_empty());
    }
}
