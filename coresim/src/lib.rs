//! Simulated compute-core fleet with fault detection and quarantine.
//!
//! A fixed set of worker threads ("cores") repeatedly run simulated tasks that
//! either succeed with a magnitude or fault. A single monitor thread polls the
//! latest result of every core, credits successes and quarantines any core
//! that faults before accruing the grace threshold of successes.
//!
//! - **[`core`]**: Pure logic (outcome sampling, quarantine ledger, summary,
//!   invariant checks). No threads, no I/O.
//! - **[`shared`]**: Thread-safe containers and signals shared between
//!   workers, the monitor and observers.
//! - **[`io`]**: Side-effecting seams (config files, clock, thread spawning),
//!   isolated so tests can substitute them.
//!
//! [`worker`], [`monitor`] and [`fleet`] wire these together into a run.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod fleet;
pub mod io;
pub mod logging;
pub mod monitor;
pub mod shared;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod worker;
