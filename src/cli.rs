use crate::error::DriverError;
use crate::metrics::{ChannelLabels, OutputFormat};
use crate::patcher::FlagMarker;
use crate::space::{ConfigurationSpace, Scenario, MAX_POWER_SET_FLAGS};
use crate::utils::validate_flag_name;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Ring benchmark driver - sweeps compile-time feature flags and reports mean latencies
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Warm-up runs per configuration (results discarded)
    #[clap(value_name = "WARMUP_RUNS")]
    pub warmup_runs: usize,

    /// Measurement runs per configuration (at least 1)
    #[clap(value_name = "MEASUREMENT_RUNS")]
    pub measurement_runs: NonZeroUsize,

    /// Directory the build and the benchmark binary run in
    #[clap(long, default_value = ".", help_heading = "Project")]
    pub project_dir: PathBuf,

    /// Source file holding the flag markers, relative to the project directory
    #[clap(long, default_value = crate::defaults::SOURCE_FILE, help_heading = "Project")]
    pub source: PathBuf,

    /// Built benchmark binary, relative to the project directory
    #[clap(long, default_value = crate::defaults::BINARY, help_heading = "Project")]
    pub binary: PathBuf,

    /// Build program
    #[clap(long, default_value = crate::defaults::BUILD_COMMAND, help_heading = "Project")]
    pub build_command: String,

    /// Extra argument for the build program (repeatable)
    #[clap(long = "build-arg", allow_hyphen_values = true, help_heading = "Project")]
    pub build_args: Vec<String>,

    /// Comma-separated flag names, in the order used for enumeration and reporting
    #[clap(long, value_delimiter = ',', default_values_t = crate::defaults::FLAGS.iter().map(|s| s.to_string()).collect::<Vec<_>>(), help_heading = "Sweep")]
    pub flags: Vec<String>,

    /// How configurations are enumerated
    #[clap(long, value_enum, default_value_t = SpaceKind::PowerSet, help_heading = "Sweep")]
    pub space: SpaceKind,

    /// Which pair of measurements the binary prints
    #[clap(long, value_enum, default_value_t = ChannelSet::EnqueueDequeue, help_heading = "Output")]
    pub channels: ChannelSet,

    /// Override the first channel's label
    #[clap(long, help_heading = "Output")]
    pub channel_a_label: Option<String>,

    /// Override the second channel's label
    #[clap(long, help_heading = "Output")]
    pub channel_b_label: Option<String>,

    /// Format of the measurements in the binary's output
    #[clap(long, value_enum, default_value_t = OutputFormatArg::Labeled, help_heading = "Output")]
    pub output_format: OutputFormatArg,

    /// Abort the sweep when the benchmark binary exits unsuccessfully
    #[clap(long, default_value_t = false)]
    pub strict_exit: bool,

    /// Write a JSON summary of the sweep to this file
    #[clap(short = 'o', long, help_heading = "Output")]
    pub output_file: Option<PathBuf>,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

/// Configuration enumeration strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceKind {
    /// Every combination of the flags
    #[clap(name = "power-set")]
    PowerSet,

    /// The curated SPSC/MPSC x 1/2-thread scenarios
    #[clap(name = "scenarios")]
    Scenarios,
}

/// Channel label sets exposed by the benchmark modes
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChannelSet {
    /// `enqueue` and `dequeue`
    #[clap(name = "enqueue-dequeue")]
    EnqueueDequeue,

    /// `owner dequeue` and `guest enqueue`
    #[clap(name = "owner-guest")]
    OwnerGuest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    /// `label: <value> ns` log lines
    #[clap(name = "labeled")]
    Labeled,

    /// One `key=value` record per line
    #[clap(name = "key-value")]
    KeyValue,
}

impl std::fmt::Display for SpaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpaceKind::PowerSet => write!(f, "Power Set"),
            SpaceKind::Scenarios => write!(f, "Scenarios"),
        }
    }
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Labeled => OutputFormat::Labeled,
            OutputFormatArg::KeyValue => OutputFormat::KeyValue,
        }
    }
}

/// Validated driver configuration derived from `Args`
#[derive(Clone, Debug)]
pub struct DriverConfig {
    pub warmup_runs: usize,
    pub measurement_runs: NonZeroUsize,
    pub project_dir: PathBuf,
    pub source: PathBuf,
    pub binary: PathBuf,
    pub build_command: String,
    pub build_args: Vec<String>,
    pub markers: Vec<FlagMarker>,
    pub space: SpaceKind,
    pub scenarios: Vec<Scenario>,
    pub labels: ChannelLabels,
    pub output_format: OutputFormat,
    pub strict_exit: bool,
    pub output_file: Option<PathBuf>,
}

impl DriverConfig {
    /// Convert and validate parsed arguments
    ///
    /// ## Validation
    /// - Flag names are unique C identifiers
    /// - A power set spans at most `MAX_POWER_SET_FLAGS` flags
    /// - Every flag a scenario enables is among `--flags`
    /// - Channel labels are non-empty and distinct
    pub fn from_args(args: &Args) -> Result<Self, DriverError> {
        let mut seen = HashSet::new();
        for flag in &args.flags {
            validate_flag_name(flag).map_err(|e| DriverError::Usage(e.to_string()))?;
            if !seen.insert(flag.as_str()) {
                return Err(DriverError::Usage(format!("flag {} listed twice", flag)));
            }
        }

        let scenarios = match args.space {
            SpaceKind::PowerSet if args.flags.len() > MAX_POWER_SET_FLAGS => {
                return Err(DriverError::Usage(format!(
                    "a power set over {} flags is too large (at most {})",
                    args.flags.len(),
                    MAX_POWER_SET_FLAGS
                )));
            }
            SpaceKind::PowerSet => Vec::new(),
            SpaceKind::Scenarios => {
                let scenarios = Scenario::ring_modes();
                for scenario in &scenarios {
                    if let Some(missing) = scenario.enabled.iter().find(|f| !seen.contains(f.as_str())) {
                        return Err(DriverError::Usage(format!(
                            "scenario {:?} needs flag {} which is not in --flags",
                            scenario.name, missing
                        )));
                    }
                }
                scenarios
            }
        };

        let mut labels = match args.channels {
            ChannelSet::EnqueueDequeue => ChannelLabels::enqueue_dequeue(),
            ChannelSet::OwnerGuest => ChannelLabels::owner_guest(),
        };
        if let Some(ref label) = args.channel_a_label {
            labels.channel_a = label.clone();
        }
        if let Some(ref label) = args.channel_b_label {
            labels.channel_b = label.clone();
        }
        if labels.channel_a.trim().is_empty() || labels.channel_b.trim().is_empty() {
            return Err(DriverError::Usage("channel labels cannot be empty".to_string()));
        }
        if labels.channel_a == labels.channel_b {
            return Err(DriverError::Usage(format!(
                "both channels are labelled {:?}",
                labels.channel_a
            )));
        }

        Ok(Self {
            warmup_runs: args.warmup_runs,
            measurement_runs: args.measurement_runs,
            project_dir: args.project_dir.clone(),
            source: args.source.clone(),
            binary: args.binary.clone(),
            build_command: args.build_command.clone(),
            build_args: args.build_args.clone(),
            markers: args.flags.iter().map(|f| FlagMarker::define(f)).collect(),
            space: args.space,
            scenarios,
            labels,
            output_format: args.output_format.into(),
            strict_exit: args.strict_exit,
            output_file: args.output_file.clone(),
        })
    }

    pub fn flag_names(&self) -> Vec<&str> {
        self.markers.iter().map(|m| m.name.as_str()).collect()
    }

    /// The configurations this driver will sweep, in order
    pub fn configuration_space(&self) -> ConfigurationSpace {
        match self.space {
            SpaceKind::PowerSet => ConfigurationSpace::power_set(&self.flag_names()),
            SpaceKind::Scenarios => ConfigurationSpace::scenarios(&self.flag_names(), &self.scenarios),
        }
    }

    /// Source path resolved against the project directory
    pub fn source_path(&self) -> PathBuf {
        self.project_dir.join(&self.source)
    }
}
