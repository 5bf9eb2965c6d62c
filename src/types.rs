// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Newtype wrappers and type aliases for domain concepts.
//!
//! Process identifiers get a newtype so they cannot be confused with the
//! plain quantities flowing through the simulator (CPU time, memory units,
//! priorities), which stay type aliases.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Process identifier, assigned by the job file author.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Simulated CPU time in logical units.
pub type TimeUnits = u64;

/// Memory requirement in abstract memory units.
pub type MemUnits = u64;

/// Scheduling priority. Larger values are more important.
pub type Priority = u32;
