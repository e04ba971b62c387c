//! Typed errors surfaced by the simulation library.
//!
//! Simulated faults are not errors and never appear here. Missing registry
//! reports are handled inside the monitor.

use std::fmt;

use thiserror::Error;

use crate::core::types::CoreId;

/// Invalid simulation parameters, raised before any worker starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("core_count must be > 0")]
    CoreCount,
    #[error("fault_probability must be within [0, 1], got {0}")]
    FaultProbability(f64),
    #[error("delay_range_secs must satisfy 0 < min <= max, got [{min}, {max}]")]
    DelayRange { min: f64, max: f64 },
    #[error("poll_interval_secs must be > 0, got {0}")]
    PollInterval(f64),
    #[error("duration_secs must be > 0, got {0}")]
    Duration(f64),
}

/// A worker thread that could not be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnFailure {
    pub core: CoreId,
    pub reason: String,
}

/// One or more worker threads failed to start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to spawn cores [{}]", CoreList(.failures))]
pub struct SpawnError {
    pub failures: Vec<SpawnFailure>,
}

impl SpawnError {
    /// Ids of the cores that did not start, in spawn order.
    pub fn failed_cores(&self) -> Vec<CoreId> {
        self.failures.iter().map(|failure| failure.core).collect()
    }
}

struct CoreList<'a>(&'a [SpawnFailure]);

impl fmt::Display for CoreList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, failure) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", failure.core, failure.reason)?;
        }
        Ok(())
    }
}

/// Errors from driving a [`crate::fleet::Simulation`].
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error("failed to spawn monitor thread: {0}")]
    MonitorSpawn(#[source] std::io::Error),
    #[error("a simulation run is already active")]
    AlreadyRunning,
    #[error("no simulation run is active")]
    NotRunning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_error_lists_failed_cores() {
        let err = SpawnError {
            failures: vec![
                SpawnFailure {
                    core: CoreId(1),
                    reason: "out of threads".to_string(),
                },
                SpawnFailure {
                    core: CoreId(4),
                    reason: "out of threads".to_string(),
                },
            ],
        };
        assert_eq!(err.failed_cores(), vec![CoreId(1), CoreId(4)]);
        assert_eq!(
            err.to_string(),
            "failed to spawn cores [1: out of threads, 4: out of threads]"
        );
    }

    #[test]
    fn config_error_messages_name_the_field() {
        let err = ConfigError::DelayRange { min: 2.0, max: 1.0 };
        assert!(err.to_string().contains("delay_range_secs"));
    }
}
