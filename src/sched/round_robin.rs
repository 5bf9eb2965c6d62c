// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

use std::collections::VecDeque;

use anyhow::Result;

use super::{check_cancelled, wait_for_work, Scheduler, Timeline};
use crate::context::SimulationContext;
use crate::result::SimulationResult;
use crate::task::ProcessRecord;
use crate::types::TimeUnits;

pub const DEFAULT_QUANTUM: TimeUnits = 7;

/// Preemptive round robin over a strict FIFO.
///
/// Newly admitted records join the tail before each selection; a record
/// whose quantum expires goes back to the tail behind them.
#[derive(Debug, Clone, Copy)]
pub struct RoundRobinScheduler {
    quantum: TimeUnits,
}

impl RoundRobinScheduler {
    pub fn new(quantum: TimeUnits) -> Self {
        Self { quantum }
    }
}

impl Default for RoundRobinScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_QUANTUM)
    }
}

impl Scheduler for RoundRobinScheduler {
    fn name(&self) -> String {
        format!("Round Robin (q={})", self.quantum)
    }

    fn run(&self, ctx: &SimulationContext) -> Result<SimulationResult> {
        let mut timeline = Timeline::default();
        let mut fifo: VecDeque<ProcessRecord> = VecDeque::new();

        while !ctx.can_terminate(timeline.completed_count()) || !fifo.is_empty() {
            check_cancelled(ctx)?;
            ctx.drain_ready(&mut fifo);

            let Some(record) = fifo.pop_front() else {
                if !wait_for_work(ctx, &mut fifo, timeline.completed_count()) {
                    break;
                }
                continue;
            };

            if let Some(preempted) = timeline.execute(ctx, record, self.quantum) {
                fifo.push_back(preempted);
            }
        }

        Ok(timeline.finish(self.name(), ctx))
    }
}
