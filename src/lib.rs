//! # Ring Benchmark Driver Library
//!
//! Benchmarks a concurrent ring buffer under every combination of its
//! compile-time feature flags. The ring buffer itself is an external C
//! program treated as a black box; this crate drives it:
//!
//! 1. Enumerate configurations of the feature flags
//! 2. Rewrite the flag markers in the program's source for each one
//! 3. Rebuild the program
//! 4. Run it for a number of warm-up runs, then measurement runs
//! 5. Extract two nanosecond latencies from each run's output
//! 6. Report per-configuration means
//!
//! When the sweep ends, successfully or not, the source is left with every
//! flag disabled.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use ring_bench::benchmark::BenchmarkRunner;
//! use ring_bench::metrics::{ChannelLabels, MetricExtractor, OutputFormat};
//! use ring_bench::patcher::{FlagMarker, FlagPatcher};
//! use ring_bench::process::{BinaryRunner, CommandBuilder};
//! use ring_bench::results::Reporter;
//! use ring_bench::space::ConfigurationSpace;
//! use std::num::NonZeroUsize;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let flags = ["MPSC", "BATCHING", "BP"];
//!     let patcher = FlagPatcher::open(
//!         "examples/unit-tests/ring-benchmark.c",
//!         flags.iter().map(|f| FlagMarker::define(f)).collect(),
//!     )?;
//!     let extractor = MetricExtractor::new(ChannelLabels::enqueue_dequeue(), OutputFormat::Labeled)?;
//!
//!     let mut runner = BenchmarkRunner::new(
//!         CommandBuilder::new("make", vec![], "."),
//!         BinaryRunner::new(Path::new("build/examples/unit-tests/ring-benchmark"), ".", false),
//!         extractor,
//!     );
//!     let mut reporter = Reporter::new(std::io::stdout(), ChannelLabels::enqueue_dequeue());
//!     let space = ConfigurationSpace::power_set(&flags);
//!     runner.run(&patcher, &space, 1, NonZeroUsize::new(5).unwrap(), &mut reporter)?;
//!     Ok(())
//! }
//! ```

/// Warm-up/measure aggregation and the configuration sweep
pub mod benchmark;

/// Command-line interface and validated driver configuration
pub mod cli;

pub mod error;

pub mod logging;

/// Output parsing, samples and per-channel means
pub mod metrics;

/// Flag-marker rewriting of the external source with baseline restoration
pub mod patcher;

/// Build and execution of the external program
pub mod process;

/// Text report and JSON summary
pub mod results;

/// Configuration enumeration
pub mod space;

pub mod utils;

pub use benchmark::{Aggregator, BenchmarkRunner, ConfigurationResult};
pub use cli::{Args, DriverConfig};
pub use error::DriverError;
pub use metrics::{AggregateResult, MeasurementSeries, MetricExtractor, Sample};
pub use patcher::{FlagMarker, FlagPatcher};
pub use space::{Configuration, ConfigurationSpace};

/// The current version of the driver, recorded in the JSON summary
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
///
/// These reproduce the layout of the ring buffer project: the benchmark
/// source under `examples/unit-tests`, built by `make` into `build/`.
pub mod defaults {
    /// Source file containing the `#define` flag markers
    pub const SOURCE_FILE: &str = "examples/unit-tests/ring-benchmark.c";

    /// Binary produced by the build
    pub const BINARY: &str = "build/examples/unit-tests/ring-benchmark";

    pub const BUILD_COMMAND: &str = "make";

    /// Feature flags swept by default, in reporting order
    pub const FLAGS: &[&str] = &["MPSC", "BATCHING", "BP"];
}
