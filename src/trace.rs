// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Trace event recording for the simulator.
//!
//! Every lifecycle transition of interest (creation, enqueue, memory
//! allocation and release, ready admission, dispatch, yield, completion,
//! starvation, aging) is recorded as a `TraceEvent` stamped with the
//! logical time at which it happened. The log is shared by the reader,
//! the loader and the running scheduler, so appends go through a mutex
//! that is only ever held for a push.

use std::fmt;
use std::sync::Mutex;
use std::sync::PoisonError;

use log::debug;
use serde::Serialize;

use crate::types::{MemUnits, Pid, Priority, TimeUnits};

/// A single trace event produced by the simulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEvent {
    /// Logical time when this event occurred.
    pub time: TimeUnits,
    /// The kind of event.
    pub kind: TraceKind,
}

/// The type of lifecycle event recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceKind {
    /// A process record was built from a job line.
    Created {
        pid: Pid,
        burst: TimeUnits,
        priority: Priority,
    },
    /// The record was placed on the arrival queue.
    Enqueued { pid: Pid, queue_len: usize },
    /// Memory was reserved for the record.
    MemoryAllocated {
        pid: Pid,
        amount: MemUnits,
        used: MemUnits,
        capacity: MemUnits,
    },
    /// The record's reservation was returned.
    MemoryReleased {
        pid: Pid,
        used: MemUnits,
        capacity: MemUnits,
    },
    /// The loader moved the record into the ready queue.
    Admitted { pid: Pid, degree: usize },
    /// The record was given the CPU.
    Dispatched { pid: Pid },
    /// The quantum expired before the record finished.
    Yielded { pid: Pid, remaining: TimeUnits },
    /// The record ran out of work.
    Completed { pid: Pid },
    /// The record waited longer than its admission degree.
    StarvationDetected {
        pid: Pid,
        waited: TimeUnits,
        degree: usize,
    },
    /// Aging raised the record's dynamic priority.
    PriorityBoosted { pid: Pid, priority: Priority },
}

impl TraceKind {
    pub fn pid(&self) -> Pid {
        match self {
            TraceKind::Created { pid, .. }
            | TraceKind::Enqueued { pid, .. }
            | TraceKind::MemoryAllocated { pid, .. }
            | TraceKind::MemoryReleased { pid, .. }
            | TraceKind::Admitted { pid, .. }
            | TraceKind::Dispatched { pid }
            | TraceKind::Yielded { pid, .. }
            | TraceKind::Completed { pid }
            | TraceKind::StarvationDetected { pid, .. }
            | TraceKind::PriorityBoosted { pid, .. } => *pid,
        }
    }
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceKind::Created {
                pid,
                burst,
                priority,
            } => write!(f, "CREATE   pid={pid} burst={burst} prio={priority}"),
            TraceKind::Enqueued { pid, queue_len } => {
                write!(f, "ENQUEUE  pid={pid} job_queue={queue_len}")
            }
            TraceKind::MemoryAllocated {
                pid,
                amount,
                used,
                capacity,
            } => write!(f, "ALLOC    pid={pid} amount={amount} used={used}/{capacity}"),
            TraceKind::MemoryReleased {
                pid,
                used,
                capacity,
            } => write!(f, "RELEASE  pid={pid} used={used}/{capacity}"),
            TraceKind::Admitted { pid, degree } => {
                write!(f, "ADMIT    pid={pid} degree={degree}")
            }
            TraceKind::Dispatched { pid } => write!(f, "DISPATCH pid={pid}"),
            TraceKind::Yielded { pid, remaining } => {
                write!(f, "YIELD    pid={pid} remaining={remaining}")
            }
            TraceKind::Completed { pid } => write!(f, "COMPLETE pid={pid}"),
            TraceKind::StarvationDetected {
                pid,
                waited,
                degree,
            } => write!(f, "STARVE   pid={pid} waited={waited} degree={degree}"),
            TraceKind::PriorityBoosted { pid, priority } => {
                write!(f, "AGE      pid={pid} prio={priority}")
            }
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[t={:>6}] {}", self.time, self.kind)
    }
}

#[derive(Debug, Default)]
struct Entries {
    events: Vec<TraceEvent>,
    starvation: Vec<String>,
}

/// Event sink shared by every activity of one simulation run.
#[derive(Debug, Default)]
pub struct EventLog {
    inner: Mutex<Entries>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, time: TimeUnits, kind: TraceKind) {
        let event = TraceEvent { time, kind };
        debug!("{event}");

        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let TraceKind::StarvationDetected {
            pid,
            waited,
            degree,
        } = &event.kind
        {
            inner.starvation.push(format!(
                "pid {pid} waited {waited} units in ready state (admission degree {degree})"
            ));
        }
        inner.events.push(event);
    }

    /// Copy of every event recorded so far, in recording order.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .clone()
    }

    /// Copy of the starvation notices recorded so far.
    pub fn starvation_notices(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .starvation
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Count the events of a trace that match `pred`.
pub fn count_events<F>(events: &[TraceEvent], pred: F) -> usize
where
    F: Fn(&TraceKind) -> bool,
{
    events.iter().filter(|e| pred(&e.kind)).count()
}

/// Count the number of times a process was dispatched.
pub fn dispatch_count(events: &[TraceEvent], pid: Pid) -> usize {
    count_events(events, |k| matches!(k, TraceKind::Dispatched { pid: p } if *p == pid))
}

/// Sum the CPU time a process received.
///
/// Adds up the intervals between a `Dispatched` event and the next
/// `Yielded`/`Completed` event for that process.
pub fn total_runtime(events: &[TraceEvent], pid: Pid) -> TimeUnits {
    let mut total: TimeUnits = 0;
    let mut running_since: Option<TimeUnits> = None;

    for event in events {
        match &event.kind {
            TraceKind::Dispatched { pid: p } if *p == pid => {
                running_since = Some(event.time);
            }
            TraceKind::Yielded { pid: p, .. } | TraceKind::Completed { pid: p } if *p == pid => {
                if let Some(start) = running_since.take() {
                    total += event.time - start;
                }
            }
            _ => {}
        }
    }

    total
}
