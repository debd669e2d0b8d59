//! # Utility Functions
//!
//! Small helpers shared by the sweep: arithmetic mean, log-friendly
//! durations, run identifiers and flag-name validation.

use anyhow::Result;
use std::time::Duration;
use uuid::Uuid;

/// Generate a unique identifier for a sweep
///
/// Recorded in the JSON summary so results from different invocations can
/// be told apart.
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Arithmetic mean of `values`
///
/// ## Returns
/// `None` when `values` is empty; a mean of zero samples is undefined and
/// must never be reported as a number.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Format a build or sweep duration for log output
///
/// ```rust
/// # use ring_bench::utils::format_duration;
/// # use std::time::Duration;
/// assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
/// assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
/// assert_eq!(format_duration(Duration::from_secs(3725)), "62m 05s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        0 => format!("{}ms", duration.as_millis()),
        1..=59 => format!("{:.1}s", duration.as_secs_f64()),
        _ => format!("{}m {:02}s", secs / 60, secs % 60),
    }
}

/// Validate a flag name for use in a `#define` marker
///
/// Names must be non-empty C identifiers made of ASCII letters, digits and
/// underscores, not starting with a digit.
pub fn validate_flag_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    match chars.next() {
        None => anyhow::bail!("Flag name cannot be empty"),
        Some(c) if c.is_ascii_digit() => {
            anyhow::bail!("Flag name {:?} cannot start with a digit", name)
        }
        _ => {}
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        anyhow::bail!(
            "Flag name {:?} may only contain ASCII letters, digits and '_'",
            name
        );
    }
    Ok(())
}

/// Progress prefix for log lines, e.g. `[3/8]`
pub fn progress_label(current: usize, total: usize) -> String {
    let width = total.to_string().len();
    format!("[{:>width$}/{}]", current, total, width = width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[10.0, 20.0, 30.0]), Some(20.0));
        assert_eq!(mean(&[4.5]), Some(4.5));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_micros(1500)), "1ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m 00s");
    }

    #[test]
    fn test_validate_flag_name() {
        assert!(validate_flag_name("MPSC").is_ok());
        assert!(validate_flag_name("SPSC_OPT").is_ok());
        assert!(validate_flag_name("_X1").is_ok());

        assert!(validate_flag_name("").is_err());
        assert!(validate_flag_name("1BP").is_err());
        assert!(validate_flag_name("BP X").is_err());
        assert!(validate_flag_name("BP;").is_err());
    }

    #[test]
    fn test_progress_label() {
        assert_eq!(progress_label(3, 8), "[3/8]");
        assert_eq!(progress_label(3, 12), "[ 3/12]");
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(generate_run_id(), generate_run_id());
    }
}
