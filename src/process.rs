//! # External Build and Execution
//!
//! The driver treats the build toolchain and the benchmarked binary as black
//! boxes. Both are invoked synchronously: the driver blocks until the child
//! exits, with no timeout.
//!
//! The `Builder` and `Runner` traits are the seams the sweep is written
//! against; `CommandBuilder` and `BinaryRunner` are the process-backed
//! implementations.

use crate::error::DriverError;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Rebuilds the benchmarked program from the current source
pub trait Builder {
    fn build(&mut self) -> Result<(), DriverError>;
}

/// Executes the built program once and returns its standard output
pub trait Runner {
    fn run_once(&mut self) -> Result<String, DriverError>;
}

/// Runs a build command (e.g. `make`) in the project directory
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl CommandBuilder {
    pub fn new(program: impl Into<String>, args: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
        }
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Builder for CommandBuilder {
    fn build(&mut self) -> Result<(), DriverError> {
        let command = self.command_line();
        debug!("Running build `{}` in {:?}", command, self.working_dir);
        let start = Instant::now();

        let output = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| DriverError::BuildFailure {
                command: command.clone(),
                status: "not started".to_string(),
                output: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(DriverError::BuildFailure {
                command,
                status: output.status.to_string(),
                output: diagnostic_text(&output),
            });
        }

        info!(
            "Build finished in {}",
            crate::utils::format_duration(start.elapsed())
        );
        Ok(())
    }
}

/// Runs the built benchmark binary with no arguments
#[derive(Debug, Clone)]
pub struct BinaryRunner {
    binary: PathBuf,
    working_dir: PathBuf,
    strict_exit: bool,
}

impl BinaryRunner {
    /// `binary` is resolved against `working_dir` when relative
    pub fn new(binary: &Path, working_dir: impl Into<PathBuf>, strict_exit: bool) -> Self {
        let working_dir = working_dir.into();
        Self {
            binary: working_dir.join(binary),
            working_dir,
            strict_exit,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl Runner for BinaryRunner {
    fn run_once(&mut self) -> Result<String, DriverError> {
        let output = Command::new(&self.binary)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| DriverError::ExecutionFailure {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            if self.strict_exit {
                return Err(DriverError::BinaryFailed {
                    binary: self.binary.clone(),
                    status: output.status,
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
            // Output is still parsed; a crash before printing surfaces as a missing metric.
            warn!(
                "Benchmark binary {:?} exited with {}",
                self.binary, output.status
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// stderr of a failed child, falling back to stdout when stderr is empty
fn diagnostic_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout)
    } else {
        stderr
    };
    text.trim().to_string()
}
