//! # Driver Error Taxonomy
//!
//! Typed failures raised by the sweep components. Orchestration code carries
//! these inside `anyhow::Error`; use `downcast_ref::<DriverError>()` to
//! recover the variant.
//!
//! ## Cleanup Expectations
//!
//! - `Usage`, `MarkerNotFound` and `DuplicateMarker` are raised before the
//!   source file is touched, so there is nothing to restore.
//! - Every other variant is raised mid-sweep; the baseline guard restores the
//!   source before the process exits.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    /// Bad command-line arguments or an inconsistent driver configuration
    #[error("usage error: {0}")]
    Usage(String),

    /// A flag's enabled or disabled line is absent from the source
    #[error("flag marker for {flag} not found in {path:?} (expected `{enabled}` or `{disabled}`)")]
    MarkerNotFound {
        flag: String,
        enabled: String,
        disabled: String,
        path: PathBuf,
    },

    /// A flag's marker appears on more than one line
    #[error("flag marker for {flag} appears on lines {first} and {second} of {path:?}")]
    DuplicateMarker {
        flag: String,
        first: usize,
        second: usize,
        path: PathBuf,
    },

    #[error("failed to {action} source file {path:?}: {source}")]
    SourceIo {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The build process could not be started or exited unsuccessfully
    #[error("build command `{command}` failed ({status}): {output}")]
    BuildFailure {
        command: String,
        status: String,
        output: String,
    },

    /// The benchmarked binary could not be started
    #[error("failed to execute {binary:?}: {source}")]
    ExecutionFailure {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The benchmarked binary exited unsuccessfully (strict exit mode only)
    #[error("benchmark binary {binary:?} exited with {status}: {stderr}")]
    BinaryFailed {
        binary: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("metric `{label}` not found in benchmark output")]
    MetricNotFound { label: String },

    #[error("metric `{label}` has invalid value `{value}`")]
    InvalidMetric { label: String, value: String },
}

impl DriverError {
    /// Whether the source file may have been modified when this error was raised
    pub fn requires_restore(&self) -> bool {
        !matches!(
            self,
            DriverError::Usage(_)
                | DriverError::MarkerNotFound { .. }
                | DriverError::DuplicateMarker { .. }
        )
    }
}
