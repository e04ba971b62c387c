//! Stable exit codes for `coresim` commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid arguments or configuration, or any other failure.
pub const INVALID: i32 = 1;
/// One or more threads could not be started.
pub const SPAWN_FAILED: i32 = 2;
