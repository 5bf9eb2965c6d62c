// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Statistics computed over the completed records of a run.

use serde::Serialize;

use crate::result::ExecutionSlice;
use crate::task::ProcessRecord;
use crate::types::TimeUnits;

/// Summary of one per-process metric across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DistributionStats {
    pub count: usize,
    pub min: TimeUnits,
    pub max: TimeUnits,
    pub sum: TimeUnits,
}

impl FromIterator<TimeUnits> for DistributionStats {
    fn from_iter<I: IntoIterator<Item = TimeUnits>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), |acc, v| Self {
            count: acc.count + 1,
            min: if acc.count == 0 { v } else { acc.min.min(v) },
            max: acc.max.max(v),
            sum: acc.sum + v,
        })
    }
}

/// Aggregate statistics of one simulation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub waiting: DistributionStats,
    pub turnaround: DistributionStats,
    pub response: DistributionStats,
    /// Logical time at which the last slice ended.
    pub makespan: TimeUnits,
    /// Number of dispatches, i.e. execution slices.
    pub dispatches: usize,
    /// Dispatches that ended with the process put back in the ready set.
    pub preemptions: usize,
}

impl RunStats {
    pub fn compute(completed: &[ProcessRecord], slices: &[ExecutionSlice]) -> Self {
        let dispatches = slices.len();
        Self {
            waiting: completed.iter().map(|p| p.waiting_time()).collect(),
            turnaround: completed
                .iter()
                .filter_map(|p| p.turnaround_time())
                .collect(),
            response: completed.iter().filter_map(|p| p.response_time()).collect(),
            makespan: slices.iter().map(|s| s.end).max().unwrap_or(0),
            dispatches,
            preemptions: dispatches.saturating_sub(completed.len()),
        }
    }
}
