//! Shared deterministic types for the simulation core.
//!
//! These types define stable contracts between workers, the monitor and the
//! presentation layer. They must not depend on threads or I/O.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a simulated core, assigned at spawn time (`0..n`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoreId(pub u32);

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Smallest magnitude a successful task can report.
pub const MIN_MAGNITUDE: u8 = 1;
/// Largest magnitude a successful task can report.
pub const MAX_MAGNITUDE: u8 = 100;

/// Result of one simulated task.
///
/// A fault is an expected outcome handled by the quarantine policy, never an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskOutcome {
    /// Task completed with a magnitude in `MIN_MAGNITUDE..=MAX_MAGNITUDE`.
    Success(u8),
    Fault,
}

impl TaskOutcome {
    pub fn is_fault(self) -> bool {
        matches!(self, TaskOutcome::Fault)
    }
}

/// Entry appended to the completion list by a worker when it terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub core: CoreId,
    /// Non-fault outcomes the worker itself produced. Cross-check only; the
    /// monitor's counter is authoritative.
    pub local_successes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_with_lowercase_tags() {
        let success = serde_json::to_string(&TaskOutcome::Success(42)).expect("serialize");
        let fault = serde_json::to_string(&TaskOutcome::Fault).expect("serialize");
        assert_eq!(success, r#"{"success":42}"#);
        assert_eq!(fault, r#""fault""#);
    }

    #[test]
    fn core_id_serializes_as_plain_integer() {
        let record = CompletionRecord {
            core: CoreId(3),
            local_successes: 7,
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert_eq!(json, r#"{"core":3,"local_successes":7}"#);
    }
}
