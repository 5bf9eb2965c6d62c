// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Memory admission control.
//!
//! A fixed pool of memory units is shared by every resident process. The
//! loader blocks in [`MemoryController::allocate`] until enough capacity is
//! free; schedulers return capacity through [`MemoryController::release`]
//! when a process terminates. Both sides go through the same mutex, so
//! allocation and release events are totally ordered.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use anyhow::bail;
use anyhow::Result;

use crate::clock::LogicalClock;
use crate::trace::{EventLog, TraceKind};
use crate::types::{MemUnits, Pid};

/// Outcome of a blocking allocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// Memory was reserved. `degree` is the number of resident processes
    /// right after the reservation, this one included.
    Granted { used: MemUnits, degree: usize },
    /// The wait was interrupted before capacity became available. Nothing
    /// was reserved.
    Interrupted,
}

#[derive(Debug, Default)]
struct MemoryState {
    allocations: HashMap<Pid, MemUnits>,
    used: MemUnits,
    peak: MemUnits,
    waiters: usize,
    interrupted: bool,
}

#[derive(Debug)]
pub struct MemoryController {
    capacity: MemUnits,
    state: Mutex<MemoryState>,
    freed: Condvar,
    clock: Arc<LogicalClock>,
    events: Arc<EventLog>,
}

impl MemoryController {
    pub fn new(capacity: MemUnits, clock: Arc<LogicalClock>, events: Arc<EventLog>) -> Self {
        Self {
            capacity,
            state: Mutex::new(MemoryState::default()),
            freed: Condvar::new(),
            clock,
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve `amount` units for `pid`, blocking until they fit.
    ///
    /// Fails without blocking when `amount` exceeds the total capacity,
    /// since such a request could never be satisfied.
    pub fn allocate(&self, pid: Pid, amount: MemUnits) -> Result<Allocation> {
        if amount > self.capacity {
            bail!(
                "pid {} requests {} memory units but capacity is {}",
                pid,
                amount,
                self.capacity
            );
        }

        let mut state = self.lock();
        while !state.interrupted && amount > self.capacity - state.used {
            state.waiters += 1;
            state = self
                .freed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            state.waiters -= 1;
        }

        if state.interrupted {
            return Ok(Allocation::Interrupted);
        }

        state.used += amount;
        state.peak = state.peak.max(state.used);
        *state.allocations.entry(pid).or_insert(0) += amount;
        let used = state.used;
        let degree = state.allocations.len();

        self.events.record(
            self.clock.now(),
            TraceKind::MemoryAllocated {
                pid,
                amount,
                used,
                capacity: self.capacity,
            },
        );

        Ok(Allocation::Granted { used, degree })
    }

    /// Return the reservation held by `pid` and wake a blocked allocator.
    ///
    /// Returns the number of units released, 0 when `pid` held nothing.
    pub fn release(&self, pid: Pid) -> MemUnits {
        let mut state = self.lock();
        let Some(amount) = state.allocations.remove(&pid) else {
            return 0;
        };
        state.used = state.used.saturating_sub(amount);
        let used = state.used;

        self.events.record(
            self.clock.now(),
            TraceKind::MemoryReleased {
                pid,
                used,
                capacity: self.capacity,
            },
        );

        drop(state);
        self.freed.notify_all();
        amount
    }

    /// Wake any blocked allocator and make every later wait return
    /// [`Allocation::Interrupted`].
    pub fn interrupt(&self) {
        self.lock().interrupted = true;
        self.freed.notify_all();
    }

    /// Number of resident processes (degree of multiprogramming).
    pub fn allocated_count(&self) -> usize {
        self.lock().allocations.len()
    }

    pub fn used(&self) -> MemUnits {
        self.lock().used
    }

    /// Highest `used` value observed since construction.
    pub fn peak_used(&self) -> MemUnits {
        self.lock().peak
    }

    pub fn capacity(&self) -> MemUnits {
        self.capacity
    }

    /// Whether an allocator is currently blocked waiting for capacity.
    pub fn has_waiter(&self) -> bool {
        self.lock().waiters > 0
    }
}
