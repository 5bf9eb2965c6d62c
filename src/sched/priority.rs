// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Non-preemptive priority scheduling with aging.
//!
//! Before every selection each waiting record is checked against two
//! thresholds, both measured from the moment it last became ready:
//!
//! - it is flagged as starved, once, when it has waited longer than the
//!   number of processes that were resident when it was admitted;
//! - it earns one priority boost per `aging_interval` units waited, capped
//!   at `max_priority`.
//!
//! The highest dynamic priority wins; ties go to the longest wait, then to
//! the earliest arrival.

use std::cmp::Reverse;

use anyhow::Result;
use log::debug;

use super::{check_cancelled, wait_for_work, Scheduler, Timeline};
use crate::context::SimulationContext;
use crate::result::SimulationResult;
use crate::task::{ProcessRecord, MAX_PRIORITY};
use crate::trace::TraceKind;
use crate::types::{Priority, TimeUnits};

pub const DEFAULT_AGING_INTERVAL: TimeUnits = 5;

#[derive(Debug, Clone, Copy)]
pub struct PriorityScheduler {
    aging_interval: TimeUnits,
    max_priority: Priority,
}

impl PriorityScheduler {
    /// `aging_interval` must be positive.
    pub fn new(aging_interval: TimeUnits, max_priority: Priority) -> Self {
        debug_assert!(aging_interval > 0);
        Self {
            aging_interval: aging_interval.max(1),
            max_priority,
        }
    }

    fn apply_aging(&self, ctx: &SimulationContext, ready: &mut [ProcessRecord]) {
        let now = ctx.clock().now();
        for record in ready.iter_mut() {
            let waited = record.ready_wait(now);
            let degree = record.admission_degree();

            if waited > degree as TimeUnits && record.mark_starved(waited) {
                ctx.events().record(
                    now,
                    TraceKind::StarvationDetected {
                        pid: record.pid(),
                        waited,
                        degree,
                    },
                );
            }

            let expected = u32::try_from(waited / self.aging_interval).unwrap_or(u32::MAX);
            if record.age_to(expected, self.max_priority) {
                debug!(
                    "pid {} aged to priority {} after {} units",
                    record.pid(),
                    record.dynamic_priority(),
                    waited
                );
                ctx.events().record(
                    now,
                    TraceKind::PriorityBoosted {
                        pid: record.pid(),
                        priority: record.dynamic_priority(),
                    },
                );
            }
        }
    }
}

impl Default for PriorityScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_AGING_INTERVAL, MAX_PRIORITY)
    }
}

impl Scheduler for PriorityScheduler {
    fn name(&self) -> String {
        "Priority Scheduling".to_string()
    }

    fn run(&self, ctx: &SimulationContext) -> Result<SimulationResult> {
        let mut timeline = Timeline::default();
        let mut ready: Vec<ProcessRecord> = Vec::new();

        while !ctx.can_terminate(timeline.completed_count()) || !ready.is_empty() {
            check_cancelled(ctx)?;
            ctx.drain_ready(&mut ready);
            self.apply_aging(ctx, &mut ready);

            if ready.is_empty() {
                if !wait_for_work(ctx, &mut ready, timeline.completed_count()) {
                    break;
                }
                continue;
            }

            let now = ctx.clock().now();
            let Some(idx) = ready
                .iter()
                .enumerate()
                .max_by_key(|(_, p)| {
                    (
                        p.dynamic_priority(),
                        p.ready_wait(now),
                        Reverse(p.arrival_order()),
                    )
                })
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
