// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Job source: parses job definitions and feeds the arrival queue.
//!
//! The job file is line oriented, one job per line:
//!
//! ```text
//! # id:burst:priority;memory
//! 1:10:1;100
//! 2:5:5;100
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Ingestion stops with
//! an error on the first malformed line or when a limit is exceeded; the
//! records ingested before that point still flow through the pipeline.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use crossbeam::channel::Sender;
use log::debug;
use log::warn;

use crate::clock::LogicalClock;
use crate::context::FinishGuard;
use crate::context::PipelineStatus;
use crate::task::{JobDef, ProcessRecord};
use crate::trace::{EventLog, TraceKind};
use crate::types::{MemUnits, Pid};

/// Where job definitions come from.
#[derive(Debug, Clone)]
pub enum JobSource {
    /// A job file on disk, read line by line.
    File(PathBuf),
    /// In-memory job text in the same format.
    Text(String),
}

impl JobSource {
    fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        match self {
            JobSource::File(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open job file {}", path.display()))?;
                Ok(Box::new(BufReader::new(file)))
            }
            JobSource::Text(text) => Ok(Box::new(Cursor::new(text.clone().into_bytes()))),
        }
    }

    fn describe(&self) -> String {
        match self {
            JobSource::File(path) => path.display().to_string(),
            JobSource::Text(_) => "<inline>".to_string(),
        }
    }
}

/// Ingestion limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobLimits {
    /// Maximum number of jobs in one source.
    pub max_jobs: usize,
    /// Maximum cumulative memory requirement of all jobs.
    pub max_total_memory: MemUnits,
    /// Memory capacity of the simulated machine. A single job above it
    /// could never be admitted.
    pub memory_capacity: MemUnits,
}

impl Default for JobLimits {
    fn default() -> Self {
        Self {
            max_jobs: 30,
            max_total_memory: 2048,
            memory_capacity: 2048,
        }
    }
}

/// Parse one `id:burst:priority;memory` job line.
pub fn parse_job_line(line: &str) -> Result<JobDef> {
    let (def, memory) = line
        .split_once(';')
        .ok_or_else(|| anyhow!("expected 'id:burst:priority;memory', got {:?}", line))?;

    let fields: Vec<&str> = def.split(':').collect();
    if fields.len() != 3 {
        bail!(
            "expected 3 ':'-separated fields before ';', got {}",
            fields.len()
        );
    }

    let field = |name: &str, value: &str| -> Result<u64> {
        value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid {} {:?}", name, value.trim()))
    };

    let pid = field("id", fields[0])?;
    let burst = field("burst", fields[1])?;
    let priority = field("priority", fields[2])?;
    let memory = field("memory", memory)?;

    if burst == 0 {
        bail!("burst must be positive");
    }

    Ok(JobDef {
        pid: Pid(u32::try_from(pid).with_context(|| format!("id {} out of range", pid))?),
        burst,
        priority: u32::try_from(priority)
            .with_context(|| format!("priority {} out of range", priority))?,
        memory,
    })
}

/// Incremental validator applying [`JobLimits`] to a stream of job lines.
#[derive(Debug)]
pub struct JobParser {
    limits: JobLimits,
    count: usize,
    total_memory: MemUnits,
    seen: HashSet<Pid>,
}

impl JobParser {
    pub fn new(limits: JobLimits) -> Self {
        Self {
            limits,
            count: 0,
            total_memory: 0,
            seen: HashSet::new(),
        }
    }

    /// Feed one raw line. Returns `Ok(None)` for blank and comment lines.
    pub fn feed(&mut self, lineno: usize, raw: &str) -> Result<Option<JobDef>> {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        if self.count >= self.limits.max_jobs {
            bail!(
                "line {}: more than the maximum of {} jobs",
                lineno,
                self.limits.max_jobs
            );
        }

        let def = parse_job_line(line).with_context(|| format!("line {}", lineno))?;

        if !self.seen.insert(def.pid) {
            bail!("line {}: duplicate job id {}", lineno, def.pid);
        }
        if def.memory > self.limits.memory_capacity {
            bail!(
                "line {}: job {} needs {} memory units, more than the capacity of {}",
                lineno,
                def.pid,
                def.memory,
                self.limits.memory_capacity
            );
        }
        let total = match self.total_memory.checked_add(def.memory) {
            Some(total) if total <= self.limits.max_total_memory => total,
            _ => bail!(
                "line {}: jobs need more than the maximum of {} memory units",
                lineno,
                self.limits.max_total_memory
            ),
        };
        self.total_memory = total;

        self.count += 1;
        Ok(Some(def))
    }
}

/// Parse a whole job text up front, applying `limits`.
pub fn parse_jobs(text: &str, limits: JobLimits) -> Result<Vec<JobDef>> {
    let mut parser = JobParser::new(limits);
    let mut jobs = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if let Some(def) = parser.feed(idx + 1, line)? {
            jobs.push(def);
        }
    }
    Ok(jobs)
}

/// Reader activity: turns job lines into queued process records.
pub struct JobReader {
    source: JobSource,
    limits: JobLimits,
    arrivals: Sender<ProcessRecord>,
    clock: Arc<LogicalClock>,
    events: Arc<EventLog>,
    status: Arc<PipelineStatus>,
}

impl JobReader {
    pub fn new(
        source: JobSource,
        limits: JobLimits,
        arrivals: Sender<ProcessRecord>,
        clock: Arc<LogicalClock>,
        events: Arc<EventLog>,
        status: Arc<PipelineStatus>,
    ) -> Self {
        Self {
            source,
            limits,
            arrivals,
            clock,
            events,
            status,
        }
    }

    pub fn spawn(self) -> Result<JoinHandle<Result<usize>>> {
        thread::Builder::new()
            .name("job-reader".into())
            .spawn(move || self.run())
            .context("Failed to spawn the job reader thread")
    }

    /// Ingest every job of the source and return how many were queued.
    ///
    /// The reader-finished flag is raised on every exit path so downstream
    /// activities observe end of input even when ingestion fails.
    pub fn run(self) -> Result<usize> {
        let status = self.status.clone();
        let _finished = FinishGuard(move || status.set_reader_finished());

        let res = self.ingest();
        match &res {
            Ok(n) => debug!("reader: {} jobs ingested from {}", n, self.source.describe()),
            Err(e) => warn!(
                "reader: ingestion from {} stopped: {:#}",
                self.source.describe(),
                e
            ),
        }
        res
    }

    fn ingest(&self) -> Result<usize> {
        let input = self.source.open()?;
        let mut parser = JobParser::new(self.limits);
        let mut queued = 0;

        for (idx, line) in input.lines().enumerate() {
            let line = line
                .with_context(|| format!("Failed to read {}", self.source.describe()))?;
            let Some(def) = parser.feed(idx + 1, &line)? else {
                continue;
            };

            let now = self.clock.now();
            let mut record = ProcessRecord::new(def, now, queued);
            self.events.record(
                now,
                TraceKind::Created {
                    pid: def.pid,
                    burst: def.burst,
                    priority: def.priority,
                },
            );

            // Counted and traced before the send: the loader may admit the
            // record right away.
            record.mark_queued();
            self.status.add_job();
            self.events.record(
                now,
                TraceKind::Enqueued {
                    pid: def.pid,
                    queue_len: self.arrivals.len() + 1,
                },
            );
            self.arrivals
                .send(record)
                .map_err(|_| anyhow!("arrival queue closed while ingesting job {}", def.pid))?;
            queued += 1;
        }

        Ok(queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_job_line() {
        let def = parse_job_line(" 3 : 12 : 4 ; 256 ").unwrap();
        assert_eq!(
            def,
            JobDef {
                pid: Pid(3),
                burst: 12,
                priority: 4,
                memory: 256,
            }
        );
    }

    #[test]
    fn test_parse_job_line_errors() {
        assert!(parse_job_line("1:2:3").is_err());
        assert!(parse_job_line("1:2;3").is_err());
        assert!(parse_job_line("1:x:3;4").is_err());
        assert!(parse_job_line("1:0:3;4").is_err());
        assert!(parse_job_line("-1:2:3;4").is_err());
    }

    #[test]
    fn test_parse_jobs_skips_comments() {
        let text = "# header\n\n1:10:1;100\n   \n# 9:9:9;9\n2:5:5;100\n";
        let jobs = parse_jobs(text, JobLimits::default()).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].pid, Pid(1));
        assert_eq!(jobs[1].pid, Pid(2));
    }

    #[test]
    fn test_job_count_limit() {
        let limits = JobLimits {
            max_jobs: 2,
            ..Default::default()
        };
        let err = parse_jobs("1:1:1;1\n2:1:1;1\n3:1:1;1\n", limits).unwrap_err();
        assert!(err.to_string().contains("maximum of 2 jobs"));
    }

    #[test]
    fn test_total_memory_limit() {
        let err = parse_jobs("1:1:1;1024\n2:1:1;1024\n3:1:1;1\n", JobLimits::default())
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("more than the maximum of 2048 memory units"));
    }

    #[test]
    fn test_total_memory_overflow() {
        let limits = JobLimits {
            max_total_memory: u64::MAX,
            memory_capacity: u64::MAX,
            ..Default::default()
        };
        let text = format!("1:1:1;{}\n2:1:1;5\n", u64::MAX - 1);
        let err = parse_jobs(&text, limits).unwrap_err();
        assert!(err.to_string().starts_with("line 2"), "{err:#}");
        assert!(err.to_string().contains("memory units"), "{err:#}");
    }

    #[test]
    fn test_job_above_capacity() {
        let limits = JobLimits {
            memory_capacity: 100,
            ..Default::default()
        };
        let err = parse_jobs("1:1:1;101\n", limits).unwrap_err();
        assert!(err.to_string().contains("capacity of 100"));
    }

    #[test]
    fn test_duplicate_id() {
        let err = parse_jobs("1:1:1;1\n1:2:2;2\n", JobLimits::default()).unwrap_err();
        assert!(err.to_string().contains("duplicate job id 1"));
    }

    #[test]
    fn test_error_carries_line_number() {
        let err = parse_jobs("# c\n1:1:1;1\nbogus\n", JobLimits::default()).unwrap_err();
        assert!(format!("{:#}", err).starts_with("line 3"));
    }
}
