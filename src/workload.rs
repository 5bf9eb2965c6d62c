// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Workload definition and builder API.

use std::fmt::Write;

use crate::jobs::JobSource;
use crate::task::JobDef;
use crate::types::{MemUnits, Pid, Priority, TimeUnits};

/// An ordered batch of jobs, in ingestion order.
#[derive(Debug, Clone, Default)]
pub struct Workload {
    pub jobs: Vec<JobDef>,
}

/// Builder for constructing workloads.
pub struct WorkloadBuilder {
    jobs: Vec<JobDef>,
    next_pid: Pid,
    default_memory: MemUnits,
}

impl Workload {
    pub fn builder() -> WorkloadBuilder {
        WorkloadBuilder {
            jobs: Vec::new(),
            next_pid: Pid(1),
            default_memory: 100,
        }
    }

    /// Render the workload in the job file format.
    pub fn to_job_text(&self) -> String {
        let mut out = String::new();
        for job in &self.jobs {
            let _ = writeln!(
                out,
                "{}:{}:{};{}",
                job.pid, job.burst, job.priority, job.memory
            );
        }
        out
    }

    /// Job source feeding this workload through the regular reader.
    pub fn source(&self) -> JobSource {
        JobSource::Text(self.to_job_text())
    }

    pub fn total_memory(&self) -> MemUnits {
        self.jobs.iter().map(|j| j.memory).sum()
    }

    pub fn total_burst(&self) -> TimeUnits {
        self.jobs.iter().map(|j| j.burst).sum()
    }
}

impl WorkloadBuilder {
    /// Add a job with a full JobDef.
    pub fn job(mut self, def: JobDef) -> Self {
        self.next_pid = Pid(self.next_pid.0.max(def.pid.0 + 1));
        self.jobs.push(def);
        self
    }

    /// Convenience: add a job with auto-assigned PID and the default
    /// memory requirement.
    pub fn add_job(self, burst: TimeUnits, priority: Priority) -> Self {
        let memory = self.default_memory;
        self.add_job_with_memory(burst, priority, memory)
    }

    /// Convenience: add a job with auto-assigned PID.
    pub fn add_job_with_memory(
        mut self,
        burst: TimeUnits,
        priority: Priority,
        memory: MemUnits,
    ) -> Self {
        let pid = self.next_pid;
        self.next_pid = Pid(pid.0 + 1);
        self.jobs.push(JobDef {
            pid,
            burst,
            priority,
            memory,
        });
        self
    }

    /// Memory requirement used by [`WorkloadBuilder::add_job`].
    pub fn default_memory(mut self, memory: MemUnits) -> Self {
        self.default_memory = memory;
        self
    }

    /// Build the workload.
    pub fn build(self) -> Workload {
        Workload { jobs: self.jobs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{parse_jobs, JobLimits};

    #[test]
    fn test_builder_assigns_pids() {
        let w = Workload::builder()
            .add_job(10, 1)
            .job(JobDef {
                pid: Pid(7),
                burst: 3,
                priority: 2,
                memory: 50,
            })
            .add_job_with_memory(4, 3, 20)
            .build();

        let pids: Vec<Pid> = w.jobs.iter().map(|j| j.pid).collect();
        assert_eq!(pids, vec![Pid(1), Pid(7), Pid(8)]);
        assert_eq!(w.total_memory(), 170);
        assert_eq!(w.total_burst(), 17);
    }

    #[test]
    fn test_job_text_parses_back() {
        let w = Workload::builder()
            .default_memory(64)
            .add_job(10, 1)
            .add_job(5, 5)
            .build();
        assert_eq!(w.to_job_text(), "1:10:1;64\n2:5:5;64\n");
        assert_eq!(parse_jobs(&w.to_job_text(), JobLimits::default()).unwrap(), w.jobs);
    }
}
