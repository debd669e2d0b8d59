//! # Source Flag Patching
//!
//! The benchmarked program selects its features with `#define` lines that are
//! either live or commented out. This module rewrites those lines.
//!
//! ## Model
//!
//! - `SourceTemplate` holds the pristine text and the validated markers.
//!   `render` is a pure function of (pristine text, configuration), so
//!   applying the same configuration twice gives identical bytes and
//!   rendering the baseline reproduces a baseline pristine file exactly.
//! - `FlagPatcher` owns the file location and performs the one side effect:
//!   a whole-file write that is synced and renamed into place.
//! - `BaselineGuard` restores the baseline on every exit path.
//!
//! Lines are matched by marker text, not by index, so the rewrite does not
//! depend on line positions.

use crate::error::DriverError;
use crate::space::Configuration;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// A named compile-time switch and its two textual forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagMarker {
    pub name: String,
    pub enabled: String,
    pub disabled: String,
}

impl FlagMarker {
    /// `#define NAME` when enabled, `// #define NAME` when disabled
    pub fn define(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: format!("#define {}", name),
            disabled: format!("// #define {}", name),
        }
    }

    pub fn with_forms(name: &str, enabled: &str, disabled: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: enabled.to_string(),
            disabled: disabled.to_string(),
        }
    }

    fn matches(&self, line: &str) -> bool {
        let content = line.trim();
        content == self.enabled || content == self.disabled
    }

    fn form(&self, enabled: bool) -> &str {
        if enabled {
            &self.enabled
        } else {
            &self.disabled
        }
    }
}

/// Pristine source text with its flag markers located and validated
#[derive(Debug, Clone)]
pub struct SourceTemplate {
    pristine: String,
    markers: Vec<FlagMarker>,
}

impl SourceTemplate {
    /// Validate that every marker appears on exactly one line of `text`
    ///
    /// `path` is only used for error messages.
    pub fn parse(text: String, markers: Vec<FlagMarker>, path: &Path) -> Result<Self, DriverError> {
        for marker in &markers {
            let mut found: Option<usize> = None;

            for (index, line) in text.lines().enumerate() {
                if !marker.matches(line) {
                    continue;
                }
                if let Some(first) = found {
                    return Err(DriverError::DuplicateMarker {
                        flag: marker.name.clone(),
                        first: first + 1,
                        second: index + 1,
                        path: path.to_path_buf(),
                    });
                }
                found = Some(index);
            }

            match found {
                Some(index) => debug!("Flag {} found on line {}", marker.name, index + 1),
                None => {
                    return Err(DriverError::MarkerNotFound {
                        flag: marker.name.clone(),
                        enabled: marker.enabled.clone(),
                        disabled: marker.disabled.clone(),
                        path: path.to_path_buf(),
                    })
                }
            }
        }

        Ok(Self {
            pristine: text,
            markers,
        })
    }

    pub fn pristine(&self) -> &str {
        &self.pristine
    }

    pub fn markers(&self) -> &[FlagMarker] {
        &self.markers
    }

    /// Produce the source text for `configuration`
    ///
    /// Marker lines keep their leading indentation and line terminator; every
    /// other byte is copied from the pristine text.
    pub fn render(&self, configuration: &Configuration) -> String {
        let mut out = String::with_capacity(self.pristine.len() + 4 * self.markers.len());

        for line in self.pristine.split_inclusive('\n') {
            let (body, terminator) = split_terminator(line);

            match self.markers.iter().find(|m| m.matches(body)) {
                Some(marker) => {
                    let indent_len = body.len() - body.trim_start().len();
                    out.push_str(&body[..indent_len]);
                    out.push_str(marker.form(configuration.is_enabled(&marker.name)));
                    out.push_str(terminator);
                }
                None => out.push_str(line),
            }
        }

        out
    }

    /// Whether the pristine text already has every flag disabled
    pub fn is_baseline(&self) -> bool {
        self.pristine
            .lines()
            .filter_map(|line| self.markers.iter().find(|m| m.matches(line)).map(|m| (m, line)))
            .all(|(m, line)| line.trim() == m.disabled)
    }
}

fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Writes rendered configurations into the source file
#[derive(Debug)]
pub struct FlagPatcher {
    path: PathBuf,
    template: SourceTemplate,
    baseline: Configuration,
}

impl FlagPatcher {
    /// Read the source once and validate every marker against it
    ///
    /// A symlinked source is resolved here, so patches replace the file it
    /// points at and the link itself survives.
    pub fn open(path: impl Into<PathBuf>, markers: Vec<FlagMarker>) -> Result<Self, DriverError> {
        let path = path.into();
        let text = fs::read_to_string(&path).map_err(|source| DriverError::SourceIo {
            action: "read",
            path: path.clone(),
            source,
        })?;
        let path = fs::canonicalize(&path).map_err(|source| DriverError::SourceIo {
            action: "resolve",
            path,
            source,
        })?;

        let baseline = Configuration::baseline(
            &markers.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
        );
        let template = SourceTemplate::parse(text, markers, &path)?;

        if !template.is_baseline() {
            warn!(
                "{:?} does not start with every flag disabled; it will be left at baseline",
                path
            );
        }

        Ok(Self {
            path,
            template,
            baseline,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn template(&self) -> &SourceTemplate {
        &self.template
    }

    /// Write the source for `configuration`
    ///
    /// The text goes to a sibling temporary file which is synced and then
    /// renamed over the source, so a concurrent reader never sees a partial file.
    /// The temporary file takes the source's permissions and is removed if any
    /// step fails.
    pub fn apply(&self, configuration: &Configuration) -> Result<(), DriverError> {
        let rendered = self.template.render(configuration);
        let tmp_path = self.tmp_path();

        if let Err(e) = self.replace_with(&tmp_path, rendered.as_bytes()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        debug!("Patched {:?} for [{}]", self.path, configuration);
        Ok(())
    }

    fn replace_with(&self, tmp_path: &Path, contents: &[u8]) -> Result<(), DriverError> {
        let io_err = |action: &'static str| {
            let path = self.path.clone();
            move |source| DriverError::SourceIo {
                action,
                path,
                source,
            }
        };

        let permissions = fs::metadata(&self.path)
            .map_err(io_err("stat"))?
            .permissions();

        let mut file = fs::File::create(tmp_path).map_err(io_err("create temporary copy of"))?;
        file.set_permissions(permissions)
            .map_err(io_err("set permissions on temporary copy of"))?;
        file.write_all(contents)
            .map_err(io_err("write temporary copy of"))?;
        file.sync_all().map_err(io_err("sync temporary copy of"))?;
        drop(file);

        fs::rename(tmp_path, &self.path).map_err(io_err("replace"))
    }

    /// Write the all-disabled configuration
    pub fn restore_baseline(&self) -> Result<(), DriverError> {
        self.apply(&self.baseline)?;
        info!("Restored {:?} to baseline", self.path);
        Ok(())
    }

    /// Arm a guard that restores the baseline when it goes out of scope
    pub fn baseline_guard(&self) -> BaselineGuard<'_> {
        BaselineGuard {
            patcher: self,
            armed: true,
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!(".{}.ring-bench.tmp", file_name))
    }
}

/// Scoped cleanup for a sweep
///
/// Call `finish` on the success path to restore and observe errors. If the
/// guard is dropped unfinished (an error unwound the sweep), restoration is
/// attempted and failures are logged.
pub struct BaselineGuard<'a> {
    patcher: &'a FlagPatcher,
    armed: bool,
}

impl<'a> BaselineGuard<'a> {
    pub fn patcher(&self) -> &FlagPatcher {
        self.patcher
    }

    pub fn finish(mut self) -> Result<(), DriverError> {
        self.armed = false;
        self.patcher.restore_baseline()
    }
}

impl Drop for BaselineGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Sweep aborted; restoring {:?} to baseline", self.patcher.path());
        if let Err(e) = self.patcher.restore_baseline() {
            error!("Failed to restore baseline source: {}", e);
        }
    }
}
