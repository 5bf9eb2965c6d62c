// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Admission pipeline.
//!
//! A single background thread moves records from the arrival queue to the
//! ready queue. Each record first has to obtain its memory reservation,
//! which may block until a scheduler releases memory of a terminated
//! process. The thread stops once the reader is done and the arrival
//! queue is drained, or as soon as a shutdown is requested.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use crossbeam::channel::Receiver;
use crossbeam::channel::RecvTimeoutError;
use crossbeam::channel::Sender;
use log::debug;
use log::warn;

use crate::clock::LogicalClock;
use crate::context::FinishGuard;
use crate::context::PipelineStatus;
use crate::memory::Allocation;
use crate::memory::MemoryController;
use crate::task::ProcessRecord;
use crate::trace::{EventLog, TraceKind};

/// Shutdown handle of a running loader.
#[derive(Debug)]
pub struct LoaderControl {
    shutdown: AtomicBool,
    memory: Arc<MemoryController>,
}

impl LoaderControl {
    pub fn new(memory: Arc<MemoryController>) -> Self {
        Self {
            shutdown: AtomicBool::new(false),
            memory,
        }
    }

    /// Ask the loader to stop. A loader blocked on memory is woken up and
    /// gives up on the record it was trying to admit.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.memory.interrupt();
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

pub struct Loader {
    arrivals: Receiver<ProcessRecord>,
    ready: Sender<ProcessRecord>,
    memory: Arc<MemoryController>,
    clock: Arc<LogicalClock>,
    events: Arc<EventLog>,
    status: Arc<PipelineStatus>,
    control: Arc<LoaderControl>,
    poll_interval: Duration,
}

impl Loader {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        arrivals: Receiver<ProcessRecord>,
        ready: Sender<ProcessRecord>,
        memory: Arc<MemoryController>,
        clock: Arc<LogicalClock>,
        events: Arc<EventLog>,
        status: Arc<PipelineStatus>,
        control: Arc<LoaderControl>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            arrivals,
            ready,
            memory,
            clock,
            events,
            status,
            control,
            poll_interval,
        }
    }

    pub fn spawn(self) -> Result<JoinHandle<Result<()>>> {
        thread::Builder::new()
            .name("process-loader".into())
            .spawn(move || self.run())
            .context("Failed to spawn the loader thread")
    }

    /// Run the admission loop on the current thread. The loader-finished
    /// flag is raised on every exit path, including errors and panics.
    pub fn run(self) -> Result<()> {
        let status = self.status.clone();
        let _finished = FinishGuard(move || status.set_loader_finished());

        let res = self.admit_all();
        if res.is_err() {
            self.status.set_aborted();
        }
        res
    }

    fn admit_all(&self) -> Result<()> {
        loop {
            if self.control.shutdown_requested() {
                debug!("loader: shutdown requested");
                break;
            }

            let mut record = match self.arrivals.recv_timeout(self.poll_interval) {
                Ok(record) => record,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    if self.status.reader_finished() && self.arrivals.is_empty() {
                        debug!("loader: arrival queue drained");
                        break;
                    }
                    continue;
                }
            };

            let degree = match self.memory.allocate(record.pid(), record.memory())? {
                Allocation::Granted { degree, .. } => degree,
                Allocation::Interrupted => {
                    warn!(
                        "loader: shutdown while pid {} waited for memory",
                        record.pid()
                    );
                    break;
                }
            };

            let now = self.clock.now();
            record.mark_admitted(now, degree);
            self.events.record(
                now,
                TraceKind::Admitted {
                    pid: record.pid(),
                    degree,
                },
            );
            if let Err(err) = self.ready.send(record) {
                // Nobody will ever consume the ready queue again.
                self.memory.release(err.0.pid());
                break;
            }
            // Counted only once the record is in the ready queue, batch
            // start relies on it.
            self.status.add_admitted();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crossbeam::channel::unbounded;

    use super::*;
    use crate::task::{JobDef, ProcessState};
    use crate::types::Pid;

    struct Harness {
        memory: Arc<MemoryController>,
        status: Arc<PipelineStatus>,
        control: Arc<LoaderControl>,
    }

    fn queued(pid: u32, memory: u64) -> ProcessRecord {
        let mut record = ProcessRecord::new(
            JobDef {
                pid: Pid(pid),
                burst: 5,
                priority: 1,
                memory,
            },
            0,
            pid as usize,
        );
        record.mark_queued();
        record
    }

    fn loader(
        capacity: u64,
        arrivals: Receiver<ProcessRecord>,
        ready: Sender<ProcessRecord>,
    ) -> (Loader, Harness) {
        let clock = Arc::new(LogicalClock::new());
        let events = Arc::new(EventLog::new());
        let memory = Arc::new(MemoryController::new(capacity, clock.clone(), events.clone()));
        let status = Arc::new(PipelineStatus::new());
        let control = Arc::new(LoaderControl::new(memory.clone()));
        let loader = Loader::new(
            arrivals,
            ready,
            memory.clone(),
            clock,
            events,
            status.clone(),
            control.clone(),
            Duration::from_millis(1),
        );
        (
            loader,
            Harness {
                memory,
                status,
                control,
            },
        )
    }

    #[test]
    fn test_admits_until_reader_finished() {
        let (arrival_tx, arrival_rx) = unbounded();
        let (ready_tx, ready_rx) = unbounded();
        let (loader, h) = loader(100, arrival_rx, ready_tx);

        arrival_tx.send(queued(1, 40)).unwrap();
        arrival_tx.send(queued(2, 60)).unwrap();
        h.status.set_reader_finished();
        drop(arrival_tx);

        loader.run().unwrap();

        let admitted: Vec<ProcessRecord> = ready_rx.try_iter().collect();
        assert_eq!(admitted.len(), 2);
        assert!(admitted.iter().all(|p| p.state() == ProcessState::Ready));
        assert_eq!(admitted[0].admission_degree(), 1);
        assert_eq!(admitted[1].admission_degree(), 2);
        assert_eq!(h.status.admitted(), 2);
        assert!(h.status.loader_finished());
        assert_eq!(h.memory.used(), 100);
    }

    #[test]
    fn test_admitted_count_matches_ready_queue() {
        let (arrival_tx, arrival_rx) = unbounded();
        let (ready_tx, ready_rx) = unbounded();
        let (loader, h) = loader(100, arrival_rx, ready_tx);

        for pid in 1..=3 {
            arrival_tx.send(queued(pid, 40)).unwrap();
        }
        h.status.set_reader_finished();
        let handle = loader.spawn().unwrap();

        // The third record cannot fit until something is released.
        while !h.memory.has_waiter() {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(h.status.admitted(), 2);
        assert_eq!(ready_rx.len(), h.status.admitted());

        h.control.request_shutdown();
        handle.join().unwrap().unwrap();
        assert_eq!(ready_rx.len(), 2);
        assert_eq!(h.status.admitted(), 2);
    }

    #[test]
    fn test_shutdown_interrupts_blocked_admission() {
        let (arrival_tx, arrival_rx) = unbounded();
        let (ready_tx, ready_rx) = unbounded();
        let (loader, h) = loader(10, arrival_rx, ready_tx);

        h.memory.allocate(Pid(9), 10).unwrap();
        arrival_tx.send(queued(1, 5)).unwrap();
        let handle = loader.spawn().unwrap();

        while !h.memory.has_waiter() {
            thread::sleep(Duration::from_millis(1));
        }
        h.control.request_shutdown();

        handle.join().unwrap().unwrap();
        assert!(ready_rx.is_empty());
        assert_eq!(h.memory.used(), 10);
        assert_eq!(h.status.admitted(), 0);
        assert!(h.status.loader_finished());
        assert!(!h.status.aborted());
    }
}
