// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Shared view of one simulation run.
//!
//! The reader, the loader and the running scheduler only communicate
//! through the arrival and ready channels plus the handful of flags in
//! [`PipelineStatus`]. [`SimulationContext`] bundles the consumer side of
//! that surface for the scheduling algorithms.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::Receiver;
use crossbeam::channel::RecvTimeoutError;

use crate::clock::LogicalClock;
use crate::loader::LoaderControl;
use crate::memory::MemoryController;
use crate::task::ProcessRecord;
use crate::trace::EventLog;

/// Progress flags published by the background activities of a run.
#[derive(Debug, Default)]
pub struct PipelineStatus {
    reader_finished: AtomicBool,
    loader_finished: AtomicBool,
    total_jobs: AtomicUsize,
    admitted: AtomicUsize,
    aborted: AtomicBool,
}

impl PipelineStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reader_finished(&self) -> bool {
        self.reader_finished.load(Ordering::Acquire)
    }

    pub fn set_reader_finished(&self) {
        self.reader_finished.store(true, Ordering::Release);
    }

    pub fn loader_finished(&self) -> bool {
        self.loader_finished.load(Ordering::Acquire)
    }

    pub fn set_loader_finished(&self) {
        self.loader_finished.store(true, Ordering::Release);
    }

    /// Number of records ingested by the reader so far.
    pub fn total_jobs(&self) -> usize {
        self.total_jobs.load(Ordering::Acquire)
    }

    pub fn add_job(&self) -> usize {
        self.total_jobs.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Number of records the loader pushed to the ready queue so far.
    pub fn admitted(&self) -> usize {
        self.admitted.load(Ordering::Acquire)
    }

    pub fn add_admitted(&self) -> usize {
        self.admitted.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Whether a background activity gave up on records it had already
    /// taken, so the run can never account for every ingested job.
    pub fn aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    pub fn set_aborted(&self) {
        self.aborted.store(true, Ordering::Release);
    }
}

/// Sets the wrapped flag when dropped, on every exit path of an activity.
pub(crate) struct FinishGuard<F: Fn()>(pub(crate) F);

impl<F: Fn()> Drop for FinishGuard<F> {
    fn drop(&mut self) {
        (self.0)()
    }
}

/// Coordination surface handed to a scheduling algorithm.
pub struct SimulationContext {
    ready: Receiver<ProcessRecord>,
    clock: Arc<LogicalClock>,
    memory: Arc<MemoryController>,
    events: Arc<EventLog>,
    status: Arc<PipelineStatus>,
    loader: Arc<LoaderControl>,
    cancel: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl SimulationContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ready: Receiver<ProcessRecord>,
        clock: Arc<LogicalClock>,
        memory: Arc<MemoryController>,
        events: Arc<EventLog>,
        status: Arc<PipelineStatus>,
        loader: Arc<LoaderControl>,
        cancel: Arc<AtomicBool>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            ready,
            clock,
            memory,
            events,
            status,
            loader,
            cancel,
            poll_interval,
        }
    }

    /// Move every record currently in the ready queue into `into`,
    /// without blocking.
    pub fn drain_ready<E: Extend<ProcessRecord>>(&self, into: &mut E) {
        into.extend(self.ready.try_iter());
    }

    /// Wait up to `timeout` for the next ready record.
    pub fn poll_ready(&self, timeout: Duration) -> Option<ProcessRecord> {
        match self.ready.recv_timeout(timeout) {
            Ok(record) => Some(record),
            Err(RecvTimeoutError::Timeout) => None,
            // The loader exited and dropped its sender. Keep the caller's
            // polling cadence instead of spinning.
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                None
            }
        }
    }

    /// Whether a scheduler that has completed `completed` records may stop.
    ///
    /// Every policy uses this same predicate, together with its own
    /// working set being empty, as its only exit condition.
    pub fn can_terminate(&self, completed: usize) -> bool {
        completed >= self.status.total_jobs()
            && self.status.reader_finished()
            && self.status.loader_finished()
            && self.ready.is_empty()
    }

    /// Ask the loader to stop once it observes the request.
    pub fn shutdown_loader(&self) {
        self.loader.request_shutdown()
    }

    /// Whether the run was cancelled from outside (e.g. Ctrl-C) or the
    /// pipeline aborted.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed) || self.status.aborted()
    }

    pub fn clock(&self) -> &LogicalClock {
        &self.clock
    }

    pub fn memory(&self) -> &MemoryController {
        &self.memory
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn status(&self) -> &PipelineStatus {
        &self.status
    }

    /// How long an idle scheduler blocks on the ready queue per iteration.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
