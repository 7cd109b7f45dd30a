//! Detached-but-tracked background worker threads.
//!
//! Workers are fire-and-forget during normal operation, but every spawn
//! registers its handle so shutdown can attempt a bounded drain instead
//! of silently abandoning everything.

use parking_lot::Mutex;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct WorkerSet {
    handles: Mutex<Vec<JoinHandle<()>>>,
    #[cfg(test)]
    refuse_spawns: std::sync::atomic::AtomicBool,
}

impl WorkerSet {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(Vec::new()),
            #[cfg(test)]
            refuse_spawns: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Spawn a named worker thread and track its handle. Finished handles
    /// are pruned opportunistically on every spawn.
    ///
    /// Returns `false` when the OS refused the thread; the closure is
    /// dropped unrun, so callers must recover from its `Drop` or from
    /// the return value.
    pub fn spawn<F>(&self, name: &str, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        #[cfg(test)]
        if self.refuse_spawns.load(std::sync::atomic::Ordering::SeqCst) {
            warn!(worker = name, "failed to spawn worker");
            return false;
        }

        let result = thread::Builder::new().name(name.to_string()).spawn(f);
        match result {
            Ok(handle) => {
                let mut handles = self.handles.lock();
                handles.retain(|h| !h.is_finished());
                handles.push(handle);
                true
            }
            Err(e) => {
                warn!(worker = name, error = %e, "failed to spawn worker");
                false
            }
        }
    }

    /// Make every subsequent spawn fail, as if the OS thread limit had
    /// been reached.
    #[cfg(test)]
    pub(crate) fn refuse_spawns(&self) {
        self.refuse_spawns
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Number of workers that have not finished yet.
    pub fn outstanding(&self) -> usize {
        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.len()
    }

    /// Wait up to `grace` for outstanding workers to finish, then abandon
    /// the rest. Returns the number abandoned.
    pub fn drain(&self, grace: Duration) -> usize {
        let deadline = Instant::now() + grace;
        loop {
            let remaining = self.outstanding();
            if remaining == 0 {
                debug!("all workers finished");
                return 0;
            }
            if Instant::now() >= deadline {
                warn!(abandoned = remaining, "abandoning outstanding workers at shutdown");
                return remaining;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Default for WorkerSet {
    fn default() -> Self {
        Self::new()
    }
}
