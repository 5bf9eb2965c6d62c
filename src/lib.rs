// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! procsim - Concurrent CPU process scheduling simulator.
//!
//! A batch of jobs goes through the life of a process on a single CPU
//! machine with a bounded amount of memory: a reader thread ingests job
//! definitions, a loader thread admits them once memory is available, and
//! one scheduling policy dispatches them on a logical clock.
//!
//! # Architecture
//!
//! - **Jobs**: job file parsing and the reader activity
//! - **Loader**: memory-gated admission from the arrival to the ready queue
//! - **Memory**: blocking admission controller with a fixed capacity
//! - **Sched**: SJF, Round Robin and Priority-with-aging policies
//! - **Runner**: wires one run together and collects its result
//!
//! # Usage
//!
//! ```rust,no_run
//! use procsim::*;
//!
//! let workload = Workload::builder()
//!     .add_job(10, 1)
//!     .add_job(5, 5)
//!     .build();
//!
//! let sim = Simulation::from_workload(Config::default(), &workload);
//! let result = sim.run_policy(Policy::Sjf).unwrap();
//! println!("avg waiting {:.2}", result.average_waiting_time());
//! ```

pub mod clock;
pub mod config;
pub mod context;
pub mod jobs;
pub mod loader;
pub mod memory;
pub mod result;
pub mod runner;
pub mod sched;
pub mod stats;
pub mod task;
pub mod trace;
pub mod types;
pub mod workload;

// Re-export the main public types for convenience.
pub use config::Config;
pub use jobs::{JobLimits, JobSource};
pub use result::{ExecutionSlice, ProcessReport, SimulationResult};
pub use runner::Simulation;
pub use sched::{Policy, PriorityScheduler, RoundRobinScheduler, Scheduler, SjfScheduler};
pub use stats::{DistributionStats, RunStats};
pub use task::{JobDef, ProcessRecord, ProcessState};
pub use trace::{TraceEvent, TraceKind};
pub use types::{MemUnits, Pid, Priority, TimeUnits};
pub use workload::Workload;
