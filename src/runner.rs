// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Run orchestration.
//!
//! A run wires a fresh set of queues, clock, memory controller and event
//! log together, starts the job reader and the loader on their own threads
//! and drives exactly one scheduling policy on the calling thread. Nothing
//! is shared between runs, so the same [`Simulation`] can be run once per
//! policy to compare them on identical input.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::anyhow;
use anyhow::Result;
use crossbeam::channel::unbounded;
use log::debug;
use log::info;

use crate::clock::LogicalClock;
use crate::config::Config;
use crate::context::{PipelineStatus, SimulationContext};
use crate::jobs::{JobReader, JobSource};
use crate::loader::{Loader, LoaderControl};
use crate::memory::MemoryController;
use crate::result::SimulationResult;
use crate::sched::{Policy, Scheduler};
use crate::trace::EventLog;
use crate::workload::Workload;

pub struct Simulation {
    config: Config,
    source: JobSource,
}

impl Simulation {
    pub fn new(config: Config, source: JobSource) -> Self {
        Self { config, source }
    }

    pub fn from_workload(config: Config, workload: &Workload) -> Self {
        Self::new(config, workload.source())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `policy` built from this simulation's configuration.
    pub fn run_policy(&self, policy: Policy) -> Result<SimulationResult> {
        let scheduler = policy.build(&self.config);
        self.run(scheduler.as_ref())
    }

    pub fn run(&self, scheduler: &dyn Scheduler) -> Result<SimulationResult> {
        self.run_with_cancel(scheduler, Arc::new(AtomicBool::new(false)))
    }

    /// Run `scheduler` until every ingested job completed or `cancel` is
    /// raised.
    ///
    /// A job source that fails part way still lets the jobs ingested before
    /// the failure run to completion, but the ingestion error is what gets
    /// returned.
    pub fn run_with_cancel(
        &self,
        scheduler: &dyn Scheduler,
        cancel: Arc<AtomicBool>,
    ) -> Result<SimulationResult> {
        let name = scheduler.name();
        info!("{}: starting run", name);

        let clock = Arc::new(LogicalClock::new());
        let events = Arc::new(EventLog::new());
        let memory = Arc::new(MemoryController::new(
            self.config.memory_capacity,
            clock.clone(),
            events.clone(),
        ));
        let status = Arc::new(PipelineStatus::new());
        let control = Arc::new(LoaderControl::new(memory.clone()));
        let (arrival_tx, arrival_rx) = unbounded();
        let (ready_tx, ready_rx) = unbounded();

        let reader = JobReader::new(
            self.source.clone(),
            self.config.job_limits(),
            arrival_tx,
            clock.clone(),
            events.clone(),
            status.clone(),
        )
        .spawn()?;

        let loader = Loader::new(
            arrival_rx,
            ready_tx,
            memory.clone(),
            clock.clone(),
            events.clone(),
            status.clone(),
            control.clone(),
            self.config.poll_interval(),
        );
        let loader = match loader.spawn() {
            Ok(handle) => handle,
            Err(e) => {
                // The reader notices the dropped arrival queue and exits.
                let _ = join(reader, "job reader");
                return Err(e);
            }
        };

        let ctx = SimulationContext::new(
            ready_rx,
            clock,
            memory.clone(),
            events,
            status,
            control,
            cancel,
            self.config.poll_interval(),
        );

        wait_for_batch_start(&ctx);
        let result = scheduler.run(&ctx);

        ctx.shutdown_loader();
        let ingested = join(reader, "job reader");
        let loaded = join(loader, "loader");

        let ingested = ingested?;
        loaded?;
        let result = result?;

        info!(
            "{}: {} jobs ingested, peak memory {}/{}",
            name,
            ingested,
            memory.peak_used(),
            memory.capacity()
        );
        Ok(result)
    }
}

/// Block until the initial ready set is settled.
///
/// The batch starts once the reader is done and the loader has either
/// admitted everything it was given or is blocked on memory, so that the
/// records the policy sees first do not depend on thread timing.
fn wait_for_batch_start(ctx: &SimulationContext) {
    let status = ctx.status();
    loop {
        if ctx.is_cancelled() {
            return;
        }

        let has_work =
            status.admitted() > 0 || status.total_jobs() == 0 || status.loader_finished();
        let quiescent = status.reader_finished()
            && (status.loader_finished()
                || status.admitted() == status.total_jobs()
                || ctx.memory().has_waiter());
        if has_work && quiescent {
            debug!(
                "batch start: {} of {} jobs ready",
                status.admitted(),
                status.total_jobs()
            );
            return;
        }

        thread::sleep(ctx.poll_interval().min(Duration::from_millis(1)));
    }
}

fn join<T>(handle: JoinHandle<Result<T>>, what: &str) -> Result<T> {
    handle
        .join()
        .map_err(|_| anyhow!("{} thread panicked", what))?
}
