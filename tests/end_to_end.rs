use std::io::Write;

use procsim::*;

mod common;

fn job_file(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_job_file_with_every_policy() {
    common::setup_test();
    let file = job_file("# id:burst:priority;memory\n1:10:1;100\n2:5:5;100\n");
    let sim = Simulation::new(
        common::test_config(),
        JobSource::File(file.path().to_path_buf()),
    );

    let sjf = sim.run_policy(Policy::Sjf).unwrap();
    assert_eq!(sjf.dispatch_order(), vec![Pid(2), Pid(1)]);
    assert_eq!(sjf.average_waiting_time(), 2.5);
    assert_eq!(sjf.average_turnaround_time(), 10.0);

    // 1 runs 0-7, 2 runs 7-12, 1 finishes 12-15.
    let rr = sim.run_policy(Policy::Rr).unwrap();
    assert_eq!(rr.slices().len(), 3);
    assert_eq!(rr.average_waiting_time(), 6.0);
    assert_eq!(rr.average_turnaround_time(), 13.5);
    assert_eq!(rr.average_response_time(), 3.5);

    // Job 2 has the higher priority and runs first, like SJF here.
    let prio = sim.run_policy(Policy::Priority).unwrap();
    assert_eq!(prio.dispatch_order(), vec![Pid(2), Pid(1)]);
    assert_eq!(prio.average_waiting_time(), 2.5);
    // Job 1 waited 5 units with an admission degree of 1.
    assert_eq!(
        prio.starvation_events_by_process().keys().copied().collect::<Vec<_>>(),
        vec![Pid(1)]
    );
}

#[test]
fn test_missing_job_file() {
    common::setup_test();
    let dir = tempfile::tempdir().unwrap();
    let sim = Simulation::new(
        common::test_config(),
        JobSource::File(dir.path().join("nope.txt")),
    );
    let err = sim.run_policy(Policy::Sjf).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to open job file"), "{err:#}");
}

#[test]
fn test_config_file_drives_run() {
    common::setup_test();
    let config_file = job_file("poll_interval_ms = 1\n\n[round_robin]\nquantum = 2\n");
    let config = Config::load(Some(config_file.path())).unwrap();

    let jobs = job_file("1:3:1;10\n2:3:1;10\n");
    let sim = Simulation::new(config, JobSource::File(jobs.path().to_path_buf()));
    let result = sim.run_policy(Policy::Rr).unwrap();

    assert_eq!(result.algorithm(), "Round Robin (q=2)");
    let pids: Vec<Pid> = result.slices().iter().map(|s| s.pid).collect();
    assert_eq!(pids, vec![Pid(1), Pid(2), Pid(1), Pid(2)]);
}

#[test]
fn test_result_serializes_to_json() {
    common::setup_test();
    let workload = Workload::builder().add_job(4, 2).add_job(9, 1).build();
    let result = common::run_workload(Policy::Rr, &workload);

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["algorithm"], "Round Robin (q=7)");
    assert_eq!(value["slices"].as_array().unwrap().len(), 3);
    assert_eq!(value["completed"][0]["pid"], 1);
    assert_eq!(value["completed"][0]["state"], "terminated");
    assert_eq!(value["events"][0]["event"], "created");
}
