//! Side-effecting helpers: time, thread creation and the config file.

pub mod clock;
pub mod config;
pub mod spawn;
