#![cfg(unix)]

use ring_bench::benchmark::BenchmarkRunner;
use ring_bench::error::DriverError;
use ring_bench::metrics::{ChannelLabels, MetricExtractor, OutputFormat};
use ring_bench::patcher::{FlagMarker, FlagPatcher};
use ring_bench::process::{BinaryRunner, CommandBuilder};
use ring_bench::results::Reporter;
use ring_bench::space::ConfigurationSpace;
use std::fs;
use std::num::NonZeroUsize;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

const SOURCE: &str = "#include <stdio.h>\n\
                      \n\
                      // #define MPSC\n\
                      // #define SPSC_OPT\n\
                      // #define BP\n\
                      \n\
                      int main(void) { return 0; }\n";

/// "Compiles" by snapshotting the source into build/
const BUILD: &str = "mkdir -p build && cp ring.c build/ring.snapshot && echo built >> builds.log";

/// Reports latencies derived from the flags compiled into the snapshot
const BENCH: &str = r#"echo run >> runs.log
if grep -q '^#define MPSC$' build/ring.snapshot; then e=20; else e=10; fi
if grep -q '^#define BP$' build/ring.snapshot; then d=4; else d=2; fi
echo "enqueue: $e.000000 ns"
echo "dequeue: $d.000000 ns""#;

fn project(bench_body: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ring.c"), SOURCE).unwrap();

    let bench = dir.path().join("bench");
    fs::write(&bench, format!("#!/bin/sh\n{}\n", bench_body)).unwrap();
    fs::set_permissions(&bench, fs::Permissions::from_mode(0o755)).unwrap();
    dir
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).map(|s| s.lines().count()).unwrap_or(0)
}

fn sweep(dir: &Path, build_script: &str, warmup: usize, runs: usize) -> (anyhow::Result<usize>, String) {
    let flags = ["MPSC", "BP"];
    let patcher = FlagPatcher::open(
        dir.join("ring.c"),
        flags.iter().map(|f| FlagMarker::define(f)).collect(),
    )
    .unwrap();
    let extractor =
        MetricExtractor::new(ChannelLabels::enqueue_dequeue(), OutputFormat::Labeled).unwrap();
    let mut runner = BenchmarkRunner::new(
        CommandBuilder::new("sh", vec!["-c".to_string(), build_script.to_string()], dir),
        BinaryRunner::new(Path::new("bench"), dir, false),
        extractor,
    );

    let mut reporter = Reporter::new(Vec::new(), ChannelLabels::enqueue_dequeue());
    let result = runner
        .run(
            &patcher,
            &ConfigurationSpace::power_set(&flags),
            warmup,
            NonZeroUsize::new(runs).unwrap(),
            &mut reporter,
        )
        .map(|results| results.len());

    (result, String::from_utf8(reporter.into_inner()).unwrap())
}

#[test]
fn full_sweep_reports_each_configuration_and_restores_source() {
    let dir = project(BENCH);
    let (result, report) = sweep(dir.path(), BUILD, 1, 1);

    assert_eq!(result.unwrap(), 4);
    assert_eq!(line_count(&dir.path().join("builds.log")), 4);
    assert_eq!(line_count(&dir.path().join("runs.log")), 8);

    let expected = [
        ("MPSC: false, BP: false", "10.000", "2.000"),
        ("MPSC: false, BP: true", "10.000", "4.000"),
        ("MPSC: true, BP: false", "20.000", "2.000"),
        ("MPSC: true, BP: true", "20.000", "4.000"),
    ];
    let mut rest = report.as_str();
    for (label, enqueue, dequeue) in expected {
        let block = format!(
            "{}\nenqueue: {} ns\ndequeue: {} ns\n",
            label, enqueue, dequeue
        );
        let at = rest.find(&block).unwrap_or_else(|| panic!("missing block:\n{}", block));
        rest = &rest[at + block.len()..];
    }

    assert_eq!(fs::read_to_string(dir.path().join("ring.c")).unwrap(), SOURCE);
}

#[test]
fn warmup_runs_are_executed_but_not_reported() {
    let dir = project(BENCH);
    let (result, _) = sweep(dir.path(), BUILD, 2, 3);

    assert_eq!(result.unwrap(), 4);
    assert_eq!(line_count(&dir.path().join("runs.log")), 4 * (2 + 3));
}

#[test]
fn missing_metric_aborts_and_restores_source() {
    let dir = project("echo 'enqueue: 5.0 ns'");
    let (result, report) = sweep(dir.path(), BUILD, 1, 1);

    let err = result.unwrap_err();
    match err.downcast_ref::<DriverError>() {
        Some(DriverError::MetricNotFound { label }) => assert_eq!(label, "dequeue"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!report.contains("enqueue:"));
    assert_eq!(fs::read_to_string(dir.path().join("ring.c")).unwrap(), SOURCE);
}

#[test]
fn build_failure_aborts_sweep_and_restores_source() {
    let dir = project(BENCH);
    let failing_build = format!(
        "if grep -q '^#define MPSC$' ring.c; then echo 'ring.c: MPSC broken' >&2; exit 1; fi; {}",
        BUILD
    );
    let (result, report) = sweep(dir.path(), &failing_build, 0, 1);

    let err = result.unwrap_err();
    match err.downcast_ref::<DriverError>() {
        Some(DriverError::BuildFailure { output, .. }) => {
            assert_eq!(output, "ring.c: MPSC broken")
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // The two MPSC-disabled configurations come first and were reported.
    assert_eq!(report.matches("enqueue:").count(), 2);
    assert_eq!(fs::read_to_string(dir.path().join("ring.c")).unwrap(), SOURCE);
}

#[test]
fn vanished_binary_aborts_sweep_and_restores_source() {
    let dir = project(BENCH);
    // Building with MPSC enabled "loses" the benchmark binary.
    let losing_build = format!(
        "if grep -q '^#define MPSC$' ring.c; then rm -f bench; fi; {}",
        BUILD
    );
    let (result, report) = sweep(dir.path(), &losing_build, 0, 1);

    let err = result.unwrap_err();
    match err.downcast_ref::<DriverError>() {
        Some(DriverError::ExecutionFailure { binary, .. }) => {
            assert_eq!(binary, &dir.path().join("bench"))
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert_eq!(report.matches("enqueue:").count(), 2);
    assert_eq!(line_count(&dir.path().join("builds.log")), 3);
    assert_eq!(fs::read_to_string(dir.path().join("ring.c")).unwrap(), SOURCE);
}

#[test]
fn missing_marker_fails_before_touching_source() {
    let dir = project(BENCH);
    let err = FlagPatcher::open(
        dir.path().join("ring.c"),
        vec![FlagMarker::define("MPSC"), FlagMarker::define("BATCHING")],
    )
    .unwrap_err();

    assert!(matches!(err, DriverError::MarkerNotFound { ref flag, .. } if flag == "BATCHING"));
    assert_eq!(fs::read_to_string(dir.path().join("ring.c")).unwrap(), SOURCE);
}
