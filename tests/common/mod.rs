#![allow(dead_code)]

use procsim::trace::total_runtime;
use procsim::*;

/// Initialize logging for a test.
///
/// `init()` fails once a logger is installed; the first call in the
/// process wins and later calls are ignored. Set `PROCSIM_TEST_DEBUG` to
/// see every trace event.
pub fn setup_test() {
    let level = if std::env::var_os("PROCSIM_TEST_DEBUG").is_some() {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };
    let _ = simplelog::SimpleLogger::init(level, simplelog::Config::default());
}

/// Default configuration with a short poll interval so idle loops spin
/// quickly in tests.
pub fn test_config() -> Config {
    Config {
        poll_interval_ms: 1,
        ..Default::default()
    }
}

pub fn run_workload(policy: Policy, workload: &Workload) -> SimulationResult {
    run_workload_with(test_config(), policy, workload)
}

pub fn run_workload_with(config: Config, policy: Policy, workload: &Workload) -> SimulationResult {
    Simulation::from_workload(config, workload)
        .run_policy(policy)
        .unwrap()
}

pub fn run_text(config: Config, policy: Policy, text: &str) -> anyhow::Result<SimulationResult> {
    Simulation::new(config, JobSource::Text(text.to_string())).run_policy(policy)
}

/// Check the invariants every finished run must satisfy.
pub fn assert_consistent(result: &SimulationResult, workload: &Workload) {
    assert_eq!(
        result.completed().len(),
        workload.jobs.len(),
        "not every job completed"
    );

    // One CPU and no idle time charged: slices tile the timeline.
    let mut now = 0;
    for slice in result.slices() {
        assert_eq!(slice.start, now, "gap or overlap at {slice:?}");
        assert!(slice.end > slice.start, "empty slice {slice:?}");
        now = slice.end;
    }
    assert_eq!(now, workload.total_burst());

    for job in &workload.jobs {
        let p = result
            .process(job.pid)
            .unwrap_or_else(|| panic!("pid {} missing", job.pid));
        assert_eq!(p.state(), ProcessState::Terminated);
        assert_eq!(p.remaining(), 0);
        assert_eq!(p.executed(), job.burst);
        assert_eq!(total_runtime(result.events(), job.pid), job.burst);

        let completion = p.completion_time().unwrap();
        let turnaround = p.turnaround_time().unwrap();
        assert_eq!(turnaround, completion - p.arrival_time());
        assert!(p.response_time().unwrap() + job.burst <= turnaround);
        assert!(p.waiting_time() + job.burst <= turnaround);
        if p.admission_time() == Some(p.arrival_time()) {
            assert_eq!(
                p.waiting_time() + job.burst,
                turnaround,
                "pid {} waiting time does not add up",
                job.pid
            );
        }
    }
}
