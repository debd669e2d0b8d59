//! # Ring Benchmark Driver - Main Entry Point
//!
//! Sweeps the ring buffer benchmark across its compile-time feature flags.
//!
//! ## Flow
//!
//! 1. **Parse arguments**: `<WARMUP_RUNS> <MEASUREMENT_RUNS>` plus options
//! 2. **Initialize logging**: colorized tracing output on stderr
//! 3. **Validate**: build the driver configuration and locate every flag
//!    marker in the pristine source
//! 4. **Sweep**: patch, build, warm up, measure and report each configuration
//! 5. **Restore**: leave the source with every flag disabled
//!
//! ## Exit Status
//!
//! `0` after a complete sweep, `1` on a usage error or any failure during the
//! sweep. Failures after the source was first patched still restore it.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use ring_bench::{
    benchmark::BenchmarkRunner,
    cli::{Args, DriverConfig},
    error::DriverError,
    logging,
    metrics::MetricExtractor,
    patcher::FlagPatcher,
    process::{BinaryRunner, CommandBuilder},
    results::{Reporter, ResultsManager, SweepSettings},
};
use std::process::ExitCode;
use tracing::{debug, error, info};

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    logging::init(args.verbose);

    match run(&args) {
        Ok(()) => {
            info!("Ring benchmark sweep completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            if let Some(cause) = e.downcast_ref::<DriverError>() {
                if !cause.requires_restore() {
                    info!("Source file was not modified");
                }
            }
            ExitCode::from(1)
        }
    }
}

/// Validate the configuration and run the sweep
///
/// Everything that can fail without touching the source (argument
/// validation, marker lookup, label patterns) happens before the first patch.
fn run(args: &Args) -> Result<()> {
    info!("Starting ring benchmark driver");
    debug!("Configuration: {:?}", args);

    let config = DriverConfig::from_args(args)?;
    let space = config.configuration_space();
    let extractor = MetricExtractor::new(config.labels.clone(), config.output_format)?;
    let patcher = FlagPatcher::open(config.source_path(), config.markers.clone())?;

    info!(
        "{} sweep over [{}] in {:?}",
        config.space,
        config.flag_names().join(", "),
        patcher.path()
    );

    let results_manager = config.output_file.as_ref().map(|path| {
        ResultsManager::new(
            path,
            SweepSettings {
                source: patcher.path().to_path_buf(),
                space: config.space,
                flags: space.flag_names().to_vec(),
                labels: config.labels.clone(),
                warmup_runs: config.warmup_runs,
                measurement_runs: config.measurement_runs.get(),
            },
        )
    });

    let builder = CommandBuilder::new(
        &config.build_command,
        config.build_args.clone(),
        &config.project_dir,
    );
    let runner = BinaryRunner::new(&config.binary, &config.project_dir, config.strict_exit);
    debug!("Benchmark binary: {:?}", runner.binary());

    let stdout = std::io::stdout();
    let mut reporter = Reporter::new(stdout.lock(), config.labels.clone());

    let results = BenchmarkRunner::new(builder, runner, extractor).run(
        &patcher,
        &space,
        config.warmup_runs,
        config.measurement_runs,
        &mut reporter,
    )?;

    if let Some(manager) = results_manager {
        manager.finalize(&results)?;
    }

    Ok(())
}
