//! Synchronization-guarded state shared between workers, the monitor and
//! readers. Every container is owned explicitly and passed by handle.

pub mod completion;
pub mod registry;
pub mod signal;
