//! # Benchmark Engine Module
//!
//! Drives the configuration sweep. For each configuration the engine:
//!
//! 1. **Patches** the source through the `FlagPatcher`
//! 2. **Builds** the program
//! 3. **Warms up**: runs the binary `warmup_runs` times and discards the samples
//! 4. **Measures**: runs it `measurement_runs` times and keeps the samples
//! 5. **Reports** the per-channel means
//!
//! Everything is sequential. Warm-up runs finish before any measurement run
//! of the same configuration, and every run of configuration *i* finishes
//! before the source is patched for *i + 1*.
//!
//! ## Failure Policy
//!
//! Nothing is retried. The first failure aborts the sweep; the baseline guard
//! held across the loop restores the source on the way out.

use crate::error::DriverError;
use crate::metrics::{AggregateResult, MeasurementSeries, MetricExtractor};
use crate::patcher::FlagPatcher;
use crate::process::{Builder, Runner};
use crate::results::Reporter;
use crate::space::{Configuration, ConfigurationSpace};
use crate::utils::{format_duration, progress_label};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::num::NonZeroUsize;
use std::time::Instant;
use tracing::{debug, info};

/// Outcome of measuring one configuration
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationResult {
    pub configuration: Configuration,
    pub series: MeasurementSeries,
    pub aggregate: AggregateResult,
}

/// Runs the warm-up-then-measure pattern for one configuration
pub struct Aggregator<R: Runner> {
    runner: R,
    extractor: MetricExtractor,
}

impl<R: Runner> Aggregator<R> {
    pub fn new(runner: R, extractor: MetricExtractor) -> Self {
        Self { runner, extractor }
    }

    pub fn extractor(&self) -> &MetricExtractor {
        &self.extractor
    }

    /// Measure the currently built binary
    ///
    /// ## Parameters
    /// - `warmup_runs`: runs whose samples are extracted and discarded
    /// - `measurement_runs`: runs whose samples are aggregated; never zero
    ///
    /// ## Errors
    /// Any runner or extraction failure, including during warm-up, ends the
    /// measurement without producing an aggregate.
    pub fn measure(
        &mut self,
        configuration: &Configuration,
        warmup_runs: usize,
        measurement_runs: NonZeroUsize,
    ) -> Result<ConfigurationResult, DriverError> {
        for i in 0..warmup_runs {
            let output = self.runner.run_once()?;
            let sample = self.extractor.extract(&output)?;
            debug!("warm-up {}/{}: {:?}", i + 1, warmup_runs, sample);
        }

        let runs = measurement_runs.get();
        let mut series = MeasurementSeries::with_capacity(runs);
        for i in 0..runs {
            let output = self.runner.run_once()?;
            let sample = self.extractor.extract(&output)?;
            debug!("run {}/{}: {:?}", i + 1, runs, sample);
            series.push(sample);
        }

        let aggregate = series
            .aggregate()
            .ok_or_else(|| DriverError::Usage("no measurement runs".to_string()))?;

        Ok(ConfigurationResult {
            configuration: configuration.clone(),
            series,
            aggregate,
        })
    }
}

/// Sweeps a configuration space: patch, build, measure, report
pub struct BenchmarkRunner<B: Builder, R: Runner> {
    builder: B,
    aggregator: Aggregator<R>,
}

impl<B: Builder, R: Runner> BenchmarkRunner<B, R> {
    pub fn new(builder: B, runner: R, extractor: MetricExtractor) -> Self {
        Self {
            builder,
            aggregator: Aggregator::new(runner, extractor),
        }
    }

    /// Run the full sweep
    ///
    /// Each configuration is reported as soon as it is measured. The source
    /// is restored to baseline after the last configuration, and also when any
    /// step fails.
    ///
    /// ## Returns
    /// - `Ok(results)`: one result per configuration, in space order
    /// - `Err(e)`: the first failure; `e.downcast_ref::<DriverError>()` gives
    ///   the typed cause
    pub fn run<W: Write>(
        &mut self,
        patcher: &FlagPatcher,
        space: &ConfigurationSpace,
        warmup_runs: usize,
        measurement_runs: NonZeroUsize,
        reporter: &mut Reporter<W>,
    ) -> Result<Vec<ConfigurationResult>> {
        let sweep_start = Instant::now();
        let total = space.len();
        let mut results = Vec::with_capacity(total);

        info!(
            "Sweeping {} configurations ({} warm-up + {} measurement runs each)",
            total, warmup_runs, measurement_runs
        );

        let guard = patcher.baseline_guard();
        reporter.begin().context("Failed to write report")?;

        for (i, configuration) in space.iter().enumerate() {
            let progress = progress_label(i + 1, total);
            info!("{} Configuration: {}", progress, configuration);

            guard.patcher().apply(configuration)?;
            self.builder
                .build()
                .with_context(|| format!("Build failed for [{}]", configuration))?;

            let result = self
                .aggregator
                .measure(configuration, warmup_runs, measurement_runs)
                .with_context(|| format!("Measurement failed for [{}]", configuration))?;

            debug!("{} Aggregate: {}", progress, result.aggregate);
            reporter
                .report(configuration, &result.aggregate)
                .context("Failed to write report")?;
            results.push(result);
        }

        guard.finish()?;

        info!(
            "Sweep finished in {}",
            format_duration(sweep_start.elapsed())
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{ChannelLabels, OutputFormat};
    use std::collections::VecDeque;

    /// Runner that replays canned outputs and counts invocations
    struct ScriptedRunner {
        outputs: VecDeque<String>,
        calls: usize,
    }

    impl ScriptedRunner {
        fn new(outputs: &[&str]) -> Self {
            Self {
                outputs: outputs.iter().map(|s| s.to_string()).collect(),
                calls: 0,
            }
        }
    }

    impl Runner for ScriptedRunner {
        fn run_once(&mut self) -> Result<String, DriverError> {
            self.calls += 1;
            Ok(self.outputs.pop_front().unwrap_or_default())
        }
    }

    fn output(a: f64, b: f64) -> String {
        format!("enqueue: {} ns\ndequeue: {} ns\n", a, b)
    }

    fn extractor() -> MetricExtractor {
        MetricExtractor::new(ChannelLabels::enqueue_dequeue(), OutputFormat::Labeled).unwrap()
    }

    #[test]
    fn test_warmup_samples_are_discarded() {
        let outputs = [
            output(9000.0, 9000.0),
            output(8000.0, 8000.0),
            output(10.0, 1.0),
            output(20.0, 2.0),
            output(30.0, 3.0),
        ];
        let refs: Vec<&str> = outputs.iter().map(String::as_str).collect();
        let mut aggregator = Aggregator::new(ScriptedRunner::new(&refs), extractor());

        let config = Configuration::baseline(&["MPSC"]);
        let result = aggregator
            .measure(&config, 2, NonZeroUsize::new(3).unwrap())
            .unwrap();

        assert_eq!(aggregator.runner.calls, 5);
        assert_eq!(result.series.len(), 3);
        assert_eq!(result.aggregate.mean_a_ns, 20.0);
        assert_eq!(result.aggregate.mean_b_ns, 2.0);
        assert_eq!(result.aggregate.sample_count, 3);
    }

    #[test]
    fn test_zero_warmup_runs() {
        let out = output(5.0, 6.0);
        let mut aggregator = Aggregator::new(ScriptedRunner::new(&[out.as_str()]), extractor());
        let result = aggregator
            .measure(&Configuration::baseline::<&str>(&[]), 0, NonZeroUsize::new(1).unwrap())
            .unwrap();
        assert_eq!(aggregator.runner.calls, 1);
        assert_eq!(result.aggregate.mean_a_ns, 5.0);
    }

    #[test]
    fn test_huge_run_count_fails_cleanly_when_output_runs_out() {
        let outputs = [output(1.0, 2.0), output(3.0, 4.0)];
        let refs: Vec<&str> = outputs.iter().map(String::as_str).collect();
        let mut aggregator = Aggregator::new(ScriptedRunner::new(&refs), extractor());

        let err = aggregator
            .measure(&Configuration::baseline(&["MPSC"]), 0, NonZeroUsize::new(usize::MAX).unwrap())
            .unwrap_err();

        assert!(matches!(err, DriverError::MetricNotFound { .. }));
        assert_eq!(aggregator.runner.calls, 3);
    }

    #[test]
    fn test_missing_metric_during_warmup_aborts() {
        let mut aggregator =
            Aggregator::new(ScriptedRunner::new(&["enqueue: 3.0 ns\n"]), extractor());
        let err = aggregator
            .measure(&Configuration::baseline(&["BP"]), 1, NonZeroUsize::new(2).unwrap())
            .unwrap_err();

        assert!(matches!(err, DriverError::MetricNotFound { .. }));
        assert_eq!(aggregator.runner.calls, 1);
    }
}
