use crate::benchmark::ConfigurationResult;
use crate::cli::SpaceKind;
use crate::metrics::{AggregateResult, ChannelLabels};
use crate::space::Configuration;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const SEPARATOR_WIDTH: usize = 40;

/// Human-readable per-configuration report
///
/// ```text
/// ----------------------------------------
/// MPSC: false, BATCHING: true, BP: false
/// enqueue: 1843.512 ns
/// dequeue: 977.250 ns
/// ----------------------------------------
/// ```
pub struct Reporter<W: Write> {
    out: W,
    labels: ChannelLabels,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, labels: ChannelLabels) -> Self {
        Self { out, labels }
    }

    /// Leading separator, written once before the first configuration
    pub fn begin(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{}", "-".repeat(SEPARATOR_WIDTH))?;
        self.out.flush()
    }

    pub fn report(&mut self, configuration: &Configuration, aggregate: &AggregateResult) -> io::Result<()> {
        write!(self.out, "{}", render(configuration, aggregate, &self.labels))?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Render one configuration's block, including its trailing separator
pub fn render(configuration: &Configuration, aggregate: &AggregateResult, labels: &ChannelLabels) -> String {
    format!(
        "{}\n{}: {:.3} ns\n{}: {:.3} ns\n{}\n",
        configuration,
        labels.channel_a,
        aggregate.mean_a_ns,
        labels.channel_b,
        aggregate.mean_b_ns,
        "-".repeat(SEPARATOR_WIDTH)
    )
}

/// Settings of the sweep, recorded alongside its results
#[derive(Debug, Clone, Serialize)]
pub struct SweepSettings {
    pub source: PathBuf,
    pub space: SpaceKind,
    pub flags: Vec<String>,
    pub labels: ChannelLabels,
    pub warmup_runs: usize,
    pub measurement_runs: usize,
}

/// System information for reproducibility
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: num_cpus::get(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SweepMetadata {
    pub version: String,
    pub run_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub system_info: SystemInfo,
    pub settings: SweepSettings,
}

/// JSON document written by `ResultsManager::finalize`
#[derive(Debug, Serialize)]
pub struct SweepSummary<'a> {
    pub metadata: SweepMetadata,
    pub results: &'a [ConfigurationResult],
}

/// Writes the JSON summary of a single sweep
pub struct ResultsManager {
    output_file: PathBuf,
    run_id: String,
    settings: SweepSettings,
}

impl ResultsManager {
    pub fn new(output_file: &Path, settings: SweepSettings) -> Self {
        Self {
            output_file: output_file.to_path_buf(),
            run_id: crate::utils::generate_run_id(),
            settings,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Serialize `results` and write them to the output file
    pub fn finalize(&self, results: &[ConfigurationResult]) -> Result<()> {
        let summary = SweepSummary {
            metadata: SweepMetadata {
                version: crate::VERSION.to_string(),
                run_id: self.run_id.clone(),
                timestamp: chrono::Utc::now(),
                system_info: SystemInfo::default(),
                settings: self.settings.clone(),
            },
            results,
        };

        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(&self.output_file, json)
            .with_context(|| format!("Failed to write results to {:?}", self.output_file))?;

        info!("Results written to: {:?}", self.output_file);
        Ok(())
    }
}
