//! Per-thread context describing the run currently executing on this thread.
//!
//! The engine owns its clock; this is only a copy of it that code without access to the engine,
//! such as the logger, can read.

use std::cell::Cell;

use crate::core::support::simulation_time::SimulationTime;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RunId(pub u32);

std::thread_local! {
    static ACTIVE_RUN: Cell<Option<RunId>> = const { Cell::new(None) };
    static CURRENT_TIME: Cell<Option<SimulationTime>> = const { Cell::new(None) };
}

/// Accessors for the current thread's worker context.
pub struct Worker;

impl Worker {
    /// Mark `run` as active on this thread until the returned guard is dropped.
    pub fn enter_run(run: RunId) -> ActiveRunGuard {
        ACTIVE_RUN.with(|x| x.set(Some(run)));
        CURRENT_TIME.with(|x| x.set(None));
        ActiveRunGuard { _private: () }
    }

    pub fn active_run() -> Option<RunId> {
        ACTIVE_RUN.try_with(|x| x.get()).ok().flatten()
    }

    pub fn set_current_time(time: SimulationTime) {
        CURRENT_TIME.with(|x| x.set(Some(time)));
    }

    pub fn current_time() -> Option<SimulationTime> {
        CURRENT_TIME.try_with(|x| x.get()).ok().flatten()
    }
}

/// Clears the worker context when dropped.
#[must_use]
pub struct ActiveRunGuard {
    _private: (),
}

impl Drop for ActiveRunGuard {
    fn drop(&mut self) {
        // the thread-locals may already be destroyed if the thread is exiting
        ACTIVE_RUN.try_with(|x| x.set(None)).ok();
        CURRENT_TIME.try_with(|x| x.set(None)).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard() {
        assert_eq!(Worker::active_run(), None);
        {
            let _guard = Worker::enter_run(RunId(3));
            Worker::set_current_time(SimulationTime::new(2.0).unwrap());
            assert_eq!(Worker::active_run(), Some(RunId(3)));
            assert_eq!(Worker::current_time(), SimulationTime::new(2.0));
        }
        assert_eq!(Worker::active_run(), None);
        assert_eq!(Worker::current_time(), None);
    }
}
