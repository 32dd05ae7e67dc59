//! Single-flight gate around notification runs.
//!
//! At most one run owns the browser profile at a time. A second trigger is
//! answered "busy" and never queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide run gate. Cloning shares the same gate.
#[derive(Clone, Default)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

/// Proof that the holder owns the single run slot; released on drop.
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the run slot without waiting. `None` when a run is in progress.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| RunPermit {
                running: self.running.clone(),
            })
    }

    /// Read-only; never contends with `try_acquire`.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let guard = RunGuard::new();
        let permit = guard.try_acquire().unwrap();
        assert!(guard.is_running());
        assert!(guard.try_acquire().is_none());
        assert!(guard.clone().try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_status_checks_never_block_acquire() {
        let guard = RunGuard::new();
        let stop = Arc::new(AtomicBool::new(false));

        let watchers: Vec<_> = (0..4)
            .map(|_| {
                let guard = guard.clone();
                let stop = stop.clone();
                std::thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        std::hint::black_box(guard.is_running());
                    }
                })
            })
            .collect();

        for _ in 0..10_000 {
            let permit = guard.try_acquire();
            assert!(permit.is_some());
        }

        stop.store(true, Ordering::Relaxed);
        for watcher in watchers {
            watcher.join().unwrap();
        }
    }
}
