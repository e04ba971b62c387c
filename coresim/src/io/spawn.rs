//! Thread creation seam.
//!
//! Spawning goes through [`Spawner`] so resource-exhaustion failures can be
//! reproduced in tests without exhausting the host.

use std::io;
use std::thread::{self, JoinHandle};

use crate::core::types::CoreId;

/// Name given to the monitor thread.
pub const MONITOR_THREAD_NAME: &str = "coresim-monitor";

/// Name given to the thread running `core`.
pub fn worker_thread_name(core: CoreId) -> String {
    format!("coresim-core-{core}")
}

/// Starts named threads.
pub trait Spawner {
    fn spawn<F, T>(&self, name: String, body: F) -> io::Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static;
}

/// Spawns OS threads through [`std::thread::Builder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSpawner;

impl Spawner for ThreadSpawner {
    fn spawn<F, T>(&self, name: String, body: F) -> io::Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        thread::Builder::new().name(name).spawn(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_spawner_names_threads() {
        let handle = ThreadSpawner
            .spawn(worker_thread_name(CoreId(7)), || {
                thread::current().name().map(str::to_string)
            })
            .expect("spawn");
        let name = handle.join().expect("join");
        assert_eq!(name.as_deref(), Some("coresim-core-7"));
    }
}
