// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Logical simulation clock.
//!
//! Time only moves when a scheduling algorithm consumes CPU on behalf of a
//! process. Idle polling never advances it, so the clock has no relation
//! to wall-clock time.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::types::TimeUnits;

#[derive(Debug, Default)]
pub struct LogicalClock {
    now: AtomicU64,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> TimeUnits {
        self.now.load(Ordering::Acquire)
    }

    /// Move the clock forward by `delta` and return the new time.
    pub fn advance(&self, delta: TimeUnits) -> TimeUnits {
        self.now.fetch_add(delta, Ordering::AcqRel) + delta
    }
}
