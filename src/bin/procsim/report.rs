// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Console rendering of simulation results.

use std::fmt::Write;

use procsim::{ExecutionSlice, SimulationResult};

/// ASCII Gantt chart of the execution timeline.
pub fn gantt_chart(slices: &[ExecutionSlice]) -> String {
    let Some(first) = slices.first() else {
        return "(no execution)".to_string();
    };

    let mut border = String::from("+");
    let mut labels = String::from("|");
    let mut times = format!("{:<8}", first.start);
    for slice in slices {
        border.push_str("-------+");
        let _ = write!(labels, " P{:<5}|", slice.pid);
        let _ = write!(times, "{:<8}", slice.end);
    }

    format!("{border}\n{labels}\n{border}\n{times}")
}

pub fn print_result(result: &SimulationResult, dump_trace: bool) {
    println!();
    println!("=== {} ===", result.algorithm());
    println!("Summary:");
    println!(
        "  - Average waiting time   : {:.2}",
        result.average_waiting_time()
    );
    println!(
        "  - Average turnaround time: {:.2}",
        result.average_turnaround_time()
    );
    println!(
        "  - Average response time  : {:.2}",
        result.average_response_time()
    );

    let stats = result.stats();
    println!(
        "  - Makespan {} units, {} dispatches, {} preemptions",
        stats.makespan, stats.dispatches, stats.preemptions
    );
    println!(
        "  - Longest wait {} units, longest turnaround {} units",
        stats.waiting.max, stats.turnaround.max
    );

    println!();
    println!("Gantt Chart:");
    println!("{}", gantt_chart(result.slices()));

    println!();
    println!("Per-Process Metrics:");
    println!(
        "  {:<10} {:<12} {:<15} {:<12}",
        "Process", "Waiting", "Turnaround", "Response"
    );
    for report in result.process_reports() {
        println!(
            "  {:<10} {:<12} {:<15} {:<12}",
            report.pid,
            report.waiting,
            report.turnaround,
            report.response
        );
    }

    let starvation = result.starvation_events_by_process();
    if !starvation.is_empty() {
        println!("Starvation notices:");
        for notes in starvation.values() {
            for note in notes {
                println!("  {note}");
            }
        }
    }

    if dump_trace {
        println!();
        println!("Trace ({} entries):", result.events().len());
        for event in result.events() {
            println!("  - {event}");
        }
    }
}

pub fn print_comparison(results: &[SimulationResult]) {
    println!();
    println!("=== Comparison Summary ===");
    println!(
        "{:<25} {:<20} {:<20} {:<20}",
        "Scheduler", "Avg Waiting", "Avg Turnaround", "Avg Response"
    );
    for result in results {
        println!(
            "{:<25} {:<20.2} {:<20.2} {:<20.2}",
            result.algorithm(),
            result.average_waiting_time(),
            result.average_turnaround_time(),
            result.average_response_time()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procsim::Pid;

    #[test]
    fn test_gantt_chart() {
        let slices = [
            ExecutionSlice::new(Pid(1), 0, 7),
            ExecutionSlice::new(Pid(12), 7, 11),
        ];
        let expected = "\
+-------+-------+
| P1    | P12   |
+-------+-------+
0       7       11      ";
        assert_eq!(gantt_chart(&slices), expected);
    }

    #[test]
    fn test_empty_gantt_chart() {
        assert_eq!(gantt_chart(&[]), "(no execution)");
    }
}
