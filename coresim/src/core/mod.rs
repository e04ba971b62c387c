//! Deterministic, pure logic for the simulation core.
//!
//! Core modules must be free of threads, clocks and I/O. They operate on
//! in-memory data and return deterministic outputs suitable for tests.

pub mod invariants;
pub mod ledger;
pub mod sampler;
pub mod summary;
pub mod types;
