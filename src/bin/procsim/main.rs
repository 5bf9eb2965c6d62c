// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! procsim - Run CPU scheduling simulations over a job file.

mod report;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use log::info;

use procsim::{Config, JobSource, Policy, Simulation, SimulationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum PolicyArg {
    Sjf,
    Rr,
    Priority,
    /// Run every policy on the same jobs and compare them.
    All,
}

impl PolicyArg {
    fn policies(self) -> Vec<Policy> {
        match self {
            PolicyArg::Sjf => vec![Policy::Sjf],
            PolicyArg::Rr => vec![Policy::Rr],
            PolicyArg::Priority => vec![Policy::Priority],
            PolicyArg::All => Policy::ALL.to_vec(),
        }
    }
}

/// Simulate CPU process scheduling over a batch of jobs.
///
/// Each line of the job file describes one job as
/// `id:burst:priority;memory`. Jobs are admitted as memory becomes
/// available and dispatched on a single simulated CPU by the selected
/// policy.
#[derive(Debug, Parser)]
#[clap(name = "procsim", version)]
struct Opts {
    /// Path to the job file.
    #[clap(default_value = "job.txt")]
    jobs: PathBuf,

    /// Scheduling policy to run.
    #[clap(short = 'p', long, value_enum, default_value = "all")]
    policy: PolicyArg,

    /// TOML configuration file.
    #[clap(short = 'c', long, env = "PROCSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Override the memory capacity of the simulated machine.
    #[clap(short = 'm', long)]
    memory: Option<u64>,

    /// Override the Round Robin quantum.
    #[clap(short = 'q', long)]
    quantum: Option<u64>,

    /// Print the full event trace of every run.
    #[clap(long)]
    dump_trace: bool,

    /// Write the results as JSON to this path.
    #[clap(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Enable verbose output, including every trace event as it happens.
    #[clap(short = 'v', long)]
    verbose: bool,
}

fn init_logging(verbose: bool) -> Result<()> {
    let loglevel = if verbose {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let mut lcfg = simplelog::ConfigBuilder::new();
    lcfg.set_time_level(simplelog::LevelFilter::Error)
        .set_location_level(simplelog::LevelFilter::Off)
        .set_target_level(simplelog::LevelFilter::Off)
        .set_thread_level(simplelog::LevelFilter::Off);
    simplelog::TermLogger::init(
        loglevel,
        lcfg.build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;
    Ok(())
}

fn load_config(opts: &Opts) -> Result<Config> {
    let mut config = Config::load(opts.config.as_deref())?;
    if let Some(memory) = opts.memory {
        config.memory_capacity = memory;
    }
    if let Some(quantum) = opts.quantum {
        config.round_robin.quantum = quantum;
    }
    config.validate()?;
    Ok(config)
}

fn run(opts: &Opts) -> Result<()> {
    let config = load_config(opts)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::Relaxed);
    })
    .context("Error setting Ctrl-C handler")?;

    info!("procsim: jobs from {}", opts.jobs.display());
    let sim = Simulation::new(config, JobSource::File(opts.jobs.clone()));

    let mut results: Vec<SimulationResult> = Vec::new();
    for policy in opts.policy.policies() {
        let scheduler = policy.build(sim.config());
        let result = sim
            .run_with_cancel(scheduler.as_ref(), shutdown.clone())
            .with_context(|| format!("{} failed", scheduler.name()))?;
        report::print_result(&result, opts.dump_trace);
        results.push(result);
    }

    if results.len() > 1 {
        report::print_comparison(&results);
    }

    if let Some(path) = &opts.json {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &results)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("wrote results to {}", path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    init_logging(opts.verbose)?;
    run(&opts)
}
