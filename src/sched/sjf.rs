// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

use anyhow::Result;

use super::{check_cancelled, wait_for_work, Scheduler, Timeline};
use crate::context::SimulationContext;
use crate::result::SimulationResult;
use crate::task::ProcessRecord;

/// Non-preemptive shortest job first.
///
/// Picks the ready record with the least remaining CPU time, ties going to
/// the earliest arrival, and runs it to completion.
#[derive(Debug, Default, Clone, Copy)]
pub struct SjfScheduler;

impl SjfScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for SjfScheduler {
    fn name(&self) -> String {
        "Shortest Job First".to_string()
    }

    fn run(&self, ctx: &SimulationContext) -> Result<SimulationResult> {
        let mut timeline = Timeline::default();
        let mut ready: Vec<ProcessRecord> = Vec::new();

        while !ctx.can_terminate(timeline.completed_count()) || !ready.is_empty() {
            check_cancelled(ctx)?;
            ctx.drain_ready(&mut ready);

            if ready.is_empty() {
                if !wait_for_work(ctx, &mut ready, timeline.completed_count()) {
                    break;
                }
                continue;
            }

            let Some(idx) = ready
                .iter()
                .enumerate()
                .min_by_key(|(_, p)| (p.remaining(), p.arrival_order()))
                .map(|(idx, _)| idx)
            else {
                continue;
            };

            let record = ready.swap_remove(idx);
            let budget = record.remaining();
            timeline.execute(ctx, record, budget);
        }

        Ok(timeline.finish(self.name(), ctx))
    }
}
