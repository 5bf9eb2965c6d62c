// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Outcome of a single simulation run.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::stats::RunStats;
use crate::task::ProcessRecord;
use crate::trace::TraceEvent;
use crate::types::{Pid, TimeUnits};

/// One contiguous interval during which a process held the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutionSlice {
    pub pid: Pid,
    pub start: TimeUnits,
    pub end: TimeUnits,
}

impl ExecutionSlice {
    pub fn new(pid: Pid, start: TimeUnits, end: TimeUnits) -> Self {
        debug_assert!(start <= end);
        Self { pid, start, end }
    }

    pub fn duration(&self) -> TimeUnits {
        self.end - self.start
    }
}

/// Per-process metrics of a completed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    pub pid: Pid,
    pub waiting: TimeUnits,
    pub turnaround: TimeUnits,
    pub response: TimeUnits,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    algorithm: String,
    slices: Vec<ExecutionSlice>,
    completed: Vec<ProcessRecord>,
    starvation_notices: Vec<String>,
    events: Vec<TraceEvent>,
}

impl SimulationResult {
    pub fn new(
        algorithm: String,
        slices: Vec<ExecutionSlice>,
        completed: Vec<ProcessRecord>,
        starvation_notices: Vec<String>,
        events: Vec<TraceEvent>,
    ) -> Self {
        Self {
            algorithm,
            slices,
            completed,
            starvation_notices,
            events,
        }
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Execution timeline, in dispatch order.
    pub fn slices(&self) -> &[ExecutionSlice] {
        &self.slices
    }

    /// Terminated records, in completion order.
    pub fn completed(&self) -> &[ProcessRecord] {
        &self.completed
    }

    pub fn starvation_notices(&self) -> &[String] {
        &self.starvation_notices
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn process(&self, pid: Pid) -> Option<&ProcessRecord> {
        self.completed.iter().find(|p| p.pid() == pid)
    }

    fn average<F>(&self, metric: F) -> f64
    where
        F: Fn(&ProcessRecord) -> TimeUnits,
    {
        if self.completed.is_empty() {
            return 0.0;
        }
        let total: TimeUnits = self.completed.iter().map(metric).sum();
        total as f64 / self.completed.len() as f64
    }

    pub fn average_waiting_time(&self) -> f64 {
        self.average(|p| p.waiting_time())
    }

    pub fn average_turnaround_time(&self) -> f64 {
        self.average(|p| p.turnaround_time().unwrap_or(0))
    }

    pub fn average_response_time(&self) -> f64 {
        self.average(|p| p.response_time().unwrap_or(0))
    }

    pub fn process_reports(&self) -> Vec<ProcessReport> {
        self.completed
            .iter()
            .map(|p| ProcessReport {
                pid: p.pid(),
                waiting: p.waiting_time(),
                turnaround: p.turnaround_time().unwrap_or(0),
                response: p.response_time().unwrap_or(0),
            })
            .collect()
    }

    /// Starvation descriptions of every record that was flagged.
    pub fn starvation_events_by_process(&self) -> BTreeMap<Pid, Vec<String>> {
        self.completed
            .iter()
            .filter(|p| p.is_starved())
            .map(|p| (p.pid(), p.starvation_events().to_vec()))
            .collect()
    }

    pub fn stats(&self) -> RunStats {
        RunStats::compute(&self.completed, &self.slices)
    }

    /// Pids in the order they were first dispatched.
    pub fn dispatch_order(&self) -> Vec<Pid> {
        let mut order: Vec<Pid> = Vec::new();
        for slice in &self.slices {
            if !order.contains(&slice.pid) {
                order.push(slice.pid);
            }
        }
        order
    }
}
