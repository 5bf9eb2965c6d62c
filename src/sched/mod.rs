// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Scheduling algorithms.
//!
//! Every policy consumes the ready queue of a [`SimulationContext`] into a
//! private working set and repeatedly picks one record to run on the single
//! simulated CPU. Policies differ only in how they pick and in how much CPU
//! they grant per dispatch; the dispatch bookkeeping lives in [`Timeline`].

use anyhow::bail;
use anyhow::Result;
use log::info;

use crate::config::Config;
use crate::context::SimulationContext;
use crate::result::{ExecutionSlice, SimulationResult};
use crate::task::ProcessRecord;
use crate::trace::TraceKind;
use crate::types::TimeUnits;

pub mod priority;
pub mod round_robin;
pub mod sjf;

pub use priority::PriorityScheduler;
pub use round_robin::RoundRobinScheduler;
pub use sjf::SjfScheduler;

/// A CPU scheduling policy.
pub trait Scheduler: Send + Sync {
    fn name(&self) -> String;

    /// Drive one run to completion.
    ///
    /// Fails when the run is cancelled or the pipeline aborts; a partial
    /// result is never returned.
    fn run(&self, ctx: &SimulationContext) -> Result<SimulationResult>;
}

/// Selectable scheduling policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Policy {
    /// Shortest job first, non-preemptive.
    Sjf,
    /// Round robin with a fixed quantum.
    Rr,
    /// Highest priority first, with aging.
    Priority,
}

impl Policy {
    pub const ALL: [Policy; 3] = [Policy::Sjf, Policy::Rr, Policy::Priority];

    pub fn build(self, config: &Config) -> Box<dyn Scheduler> {
        match self {
            Policy::Sjf => Box::new(SjfScheduler::new()),
            Policy::Rr => Box::new(RoundRobinScheduler::new(config.round_robin.quantum)),
            Policy::Priority => Box::new(PriorityScheduler::new(
                config.priority.aging_interval,
                config.priority.max_priority,
            )),
        }
    }
}

/// Fail the run if it was cancelled.
pub(crate) fn check_cancelled(ctx: &SimulationContext) -> Result<()> {
    if ctx.is_cancelled() {
        bail!("simulation interrupted");
    }
    Ok(())
}

/// Wait briefly for work when the working set is empty.
///
/// Returns false once nothing arrived and the run is allowed to stop.
pub(crate) fn wait_for_work<E: Extend<ProcessRecord>>(
    ctx: &SimulationContext,
    working: &mut E,
    completed: usize,
) -> bool {
    match ctx.poll_ready(ctx.poll_interval()) {
        Some(record) => {
            working.extend(Some(record));
            true
        }
        None => !ctx.can_terminate(completed),
    }
}

/// Dispatch bookkeeping shared by every policy: the execution slices and
/// the completed records of the run.
#[derive(Debug, Default)]
pub(crate) struct Timeline {
    slices: Vec<ExecutionSlice>,
    completed: Vec<ProcessRecord>,
}

impl Timeline {
    pub(crate) fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Give `record` the CPU for at most `budget` units.
    ///
    /// The clock advances by the CPU actually consumed. A record that runs
    /// out of work is terminated, its memory released and kept in the
    /// completed list; otherwise it is handed back in the ready state.
    pub(crate) fn execute(
        &mut self,
        ctx: &SimulationContext,
        mut record: ProcessRecord,
        budget: TimeUnits,
    ) -> Option<ProcessRecord> {
        let pid = record.pid();
        let start = ctx.clock().now();
        record.mark_dispatched(start);
        ctx.events().record(start, TraceKind::Dispatched { pid });

        let granted = record.consume_cpu(budget);
        let end = ctx.clock().advance(granted);
        self.slices.push(ExecutionSlice::new(pid, start, end));

        if record.remaining() > 0 {
            record.mark_requeued(end);
            ctx.events().record(
                end,
                TraceKind::Yielded {
                    pid,
                    remaining: record.remaining(),
                },
            );
            return Some(record);
        }

        record.mark_completed(end);
        ctx.events().record(end, TraceKind::Completed { pid });
        ctx.memory().release(pid);
        self.completed.push(record);
        None
    }

    pub(crate) fn finish(self, algorithm: String, ctx: &SimulationContext) -> SimulationResult {
        info!(
            "{}: {} processes completed in {} units",
            algorithm,
            self.completed.len(),
            ctx.clock().now()
        );
        SimulationResult::new(
            algorithm,
            self.slices,
            self.completed,
            ctx.events().starvation_notices(),
            ctx.events().events(),
        )
    }
}
