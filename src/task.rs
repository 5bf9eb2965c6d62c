// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Process record model for the simulator.
//!
//! A `ProcessRecord` is the PCB of one simulated job. It is owned by
//! exactly one activity at a time: the reader builds it, it travels through
//! the arrival channel to the loader, through the ready channel to the
//! running scheduler, and ends up in the completed list of the result.
//! Because ownership moves with the record, none of its fields need
//! synchronization.

use serde::Serialize;

use crate::types::{MemUnits, Pid, Priority, TimeUnits};

/// Default upper bound for a dynamic priority raised by aging.
pub const MAX_PRIORITY: Priority = 128;

/// The lifecycle state of a process record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Built from a job line, not yet queued.
    New,
    /// Waiting on the arrival queue for memory.
    Queued,
    /// Resident in memory and waiting for the CPU.
    Ready,
    /// Currently holding the CPU.
    Running,
    /// All CPU work done. Final.
    Terminated,
}

/// Immutable description of a job, as read from the job file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobDef {
    pub pid: Pid,
    pub burst: TimeUnits,
    pub priority: Priority,
    pub memory: MemUnits,
}

/// A simulated process at runtime.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessRecord {
    pid: Pid,
    burst: TimeUnits,
    base_priority: Priority,
    memory: MemUnits,
    arrival_time: TimeUnits,
    arrival_order: usize,

    state: ProcessState,
    dynamic_priority: Priority,
    remaining: TimeUnits,
    executed: TimeUnits,
    waiting_time: TimeUnits,
    turnaround_time: Option<TimeUnits>,
    response_time: Option<TimeUnits>,
    start_time: Option<TimeUnits>,
    completion_time: Option<TimeUnits>,
    admission_time: Option<TimeUnits>,
    admission_degree: usize,
    last_ready: TimeUnits,
    boost_count: u32,
    starved: bool,
    starvation_events: Vec<String>,
}

impl ProcessRecord {
    /// Create a record in the `New` state.
    ///
    /// `arrival_order` is the ingestion sequence number and breaks ties
    /// between otherwise equal candidates.
    pub fn new(def: JobDef, arrival_time: TimeUnits, arrival_order: usize) -> Self {
        ProcessRecord {
            pid: def.pid,
            burst: def.burst,
            base_priority: def.priority,
            memory: def.memory,
            arrival_time,
            arrival_order,
            state: ProcessState::New,
            dynamic_priority: def.priority,
            remaining: def.burst,
            executed: 0,
            waiting_time: 0,
            turnaround_time: None,
            response_time: None,
            start_time: None,
            completion_time: None,
            admission_time: None,
            admission_degree: 0,
            last_ready: arrival_time,
            boost_count: 0,
            starved: false,
            starvation_events: Vec::new(),
        }
    }

    /// `New -> Queued`: the record was placed on the arrival queue.
    pub fn mark_queued(&mut self) {
        debug_assert_eq!(self.state, ProcessState::New, "pid {}", self.pid);
        self.state = ProcessState::Queued;
    }

    /// `Queued -> Ready`: memory was reserved by the loader.
    ///
    /// Admission time and degree are recorded the first time only.
    pub fn mark_admitted(&mut self, now: TimeUnits, degree: usize) {
        debug_assert_eq!(self.state, ProcessState::Queued, "pid {}", self.pid);
        self.state = ProcessState::Ready;
        self.last_ready = now;
        if self.admission_time.is_none() {
            self.admission_time = Some(now);
            self.admission_degree = degree;
        }
    }

    /// `Ready -> Running`: charge the ready interval to the waiting time
    /// and stamp start and response times on the first dispatch.
    pub fn mark_dispatched(&mut self, now: TimeUnits) {
        debug_assert_eq!(self.state, ProcessState::Ready, "pid {}", self.pid);
        self.state = ProcessState::Running;
        if self.start_time.is_none() {
            self.start_time = Some(now);
        }
        if self.response_time.is_none() {
            self.response_time = Some(now - self.arrival_time);
        }
        self.waiting_time += now - self.last_ready;
    }

    /// Consume up to `requested` units of CPU and return the amount granted.
    pub fn consume_cpu(&mut self, requested: TimeUnits) -> TimeUnits {
        debug_assert_eq!(self.state, ProcessState::Running, "pid {}", self.pid);
        let granted = requested.min(self.remaining);
        self.remaining -= granted;
        self.executed += granted;
        granted
    }

    /// `Running -> Ready`: the quantum expired. Only the ready timestamp
    /// moves, admission metadata stays as first recorded.
    pub fn mark_requeued(&mut self, now: TimeUnits) {
        debug_assert_eq!(self.state, ProcessState::Running, "pid {}", self.pid);
        debug_assert!(self.remaining > 0, "pid {}", self.pid);
        self.state = ProcessState::Ready;
        self.last_ready = now;
    }

    /// `Running -> Terminated`.
    pub fn mark_completed(&mut self, now: TimeUnits) {
        debug_assert_eq!(self.state, ProcessState::Running, "pid {}", self.pid);
        debug_assert_eq!(self.remaining, 0, "pid {}", self.pid);
        self.state = ProcessState::Terminated;
        self.completion_time = Some(now);
        self.turnaround_time = Some(now - self.arrival_time);
    }

    /// Flag the record as starved. Returns false when it already was.
    pub fn mark_starved(&mut self, waited: TimeUnits) -> bool {
        if self.starved {
            return false;
        }
        self.starved = true;
        self.starvation_events.push(format!(
            "pid {} waited {} units before aging (admission degree {})",
            self.pid, waited, self.admission_degree
        ));
        true
    }

    /// Bring the boost count up to `expected`, raising the dynamic priority
    /// by one per missing boost without exceeding `ceiling`.
    ///
    /// Returns true when the dynamic priority actually changed.
    pub fn age_to(&mut self, expected: u32, ceiling: Priority) -> bool {
        if expected <= self.boost_count {
            return false;
        }
        let delta = expected - self.boost_count;
        self.boost_count = expected;

        let before = self.dynamic_priority;
        self.dynamic_priority = before.saturating_add(delta).min(ceiling.max(before));
        self.dynamic_priority != before
    }

    /// Time spent in the ready state since the last admission or requeue.
    pub fn ready_wait(&self, now: TimeUnits) -> TimeUnits {
        now.saturating_sub(self.last_ready)
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn burst(&self) -> TimeUnits {
        self.burst
    }

    pub fn base_priority(&self) -> Priority {
        self.base_priority
    }

    pub fn memory(&self) -> MemUnits {
        self.memory
    }

    pub fn arrival_time(&self) -> TimeUnits {
        self.arrival_time
    }

    pub fn arrival_order(&self) -> usize {
        self.arrival_order
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn dynamic_priority(&self) -> Priority {
        self.dynamic_priority
    }

    pub fn remaining(&self) -> TimeUnits {
        self.remaining
    }

    pub fn executed(&self) -> TimeUnits {
        self.executed
    }

    pub fn waiting_time(&self) -> TimeUnits {
        self.waiting_time
    }

    /// Set once the record terminates.
    pub fn turnaround_time(&self) -> Option<TimeUnits> {
        self.turnaround_time
    }

    /// Set on the first dispatch.
    pub fn response_time(&self) -> Option<TimeUnits> {
        self.response_time
    }

    pub fn start_time(&self) -> Option<TimeUnits> {
        self.start_time
    }

    pub fn completion_time(&self) -> Option<TimeUnits> {
        self.completion_time
    }

    pub fn admission_time(&self) -> Option<TimeUnits> {
        self.admission_time
    }

    pub fn admission_degree(&self) -> usize {
        self.admission_degree
    }

    pub fn last_ready(&self) -> TimeUnits {
        self.last_ready
    }

    pub fn boost_count(&self) -> u32 {
        self.boost_count
    }

    pub fn is_starved(&self) -> bool {
        self.starved
    }

    pub fn starvation_events(&self) -> &[String] {
        &self.starvation_events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(burst: TimeUnits, priority: Priority) -> ProcessRecord {
        ProcessRecord::new(
            JobDef {
                pid: Pid(1),
                burst,
                priority,
                memory: 10,
            },
            0,
            0,
        )
    }

    #[test]
    fn test_full_lifecycle() {
        let mut p = record(10, 1);
        assert_eq!(p.state(), ProcessState::New);
        p.mark_queued();
        p.mark_admitted(2, 3);
        assert_eq!(p.state(), ProcessState::Ready);
        assert_eq!(p.admission_time(), Some(2));
        assert_eq!(p.admission_degree(), 3);

        p.mark_dispatched(5);
        assert_eq!(p.start_time(), Some(5));
        assert_eq!(p.response_time(), Some(5));
        assert_eq!(p.waiting_time(), 3);
        assert_eq!(p.consume_cpu(7), 7);
        p.mark_requeued(12);
        assert_eq!(p.remaining(), 3);
        assert_eq!(p.admission_time(), Some(2));

        p.mark_dispatched(20);
        assert_eq!(p.start_time(), Some(5));
        assert_eq!(p.response_time(), Some(5));
        assert_eq!(p.waiting_time(), 11);
        assert_eq!(p.consume_cpu(7), 3);
        assert_eq!(p.remaining(), 0);
        assert_eq!(p.executed(), 10);
        p.mark_completed(23);
        assert_eq!(p.state(), ProcessState::Terminated);
        assert_eq!(p.completion_time(), Some(23));
        assert_eq!(p.turnaround_time(), Some(23));
    }

    #[test]
    fn test_starvation_flagged_once() {
        let mut p = record(5, 1);
        assert!(p.mark_starved(4));
        assert!(!p.mark_starved(9));
        assert!(p.is_starved());
        assert_eq!(p.starvation_events().len(), 1);
    }

    #[test]
    fn test_aging_respects_ceiling() {
        let mut p = record(5, 126);
        assert!(!p.age_to(0, MAX_PRIORITY));
        assert!(p.age_to(1, MAX_PRIORITY));
        assert_eq!(p.dynamic_priority(), 127);
        assert!(p.age_to(4, MAX_PRIORITY));
        assert_eq!(p.dynamic_priority(), 128);
        assert_eq!(p.boost_count(), 4);
        assert!(!p.age_to(5, MAX_PRIORITY));
        assert_eq!(p.dynamic_priority(), 128);
        assert_eq!(p.base_priority(), 126);
    }
}
