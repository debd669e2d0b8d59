//! # Measurement Extraction and Aggregation Types
//!
//! The benchmarked binary reports two latencies in nanoseconds per run. This
//! module turns its output text into a `Sample` and reduces a series of
//! samples to per-channel means.
//!
//! ## Output Contracts
//!
//! - **Labeled** (default): free-form log lines such as `guest enqueue: 41.2 ns`,
//!   matched with a fixed pattern per label.
//! - **Key-value**: one `key=value` record per line with a fixed key set, so
//!   extraction is a direct lookup.

use crate::error::DriverError;
use crate::utils::mean;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Latencies from one measurement run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub channel_a_ns: f64,
    pub channel_b_ns: f64,
}

/// Names of the two channels, as printed by the benchmarked binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLabels {
    pub channel_a: String,
    pub channel_b: String,
}

impl ChannelLabels {
    pub fn new(channel_a: &str, channel_b: &str) -> Self {
        Self {
            channel_a: channel_a.to_string(),
            channel_b: channel_b.to_string(),
        }
    }

    /// Producer/consumer labels: `enqueue`, `dequeue`
    pub fn enqueue_dequeue() -> Self {
        Self::new("enqueue", "dequeue")
    }

    /// Owner/guest labels: `owner dequeue`, `guest enqueue`
    pub fn owner_guest() -> Self {
        Self::new("owner dequeue", "guest enqueue")
    }
}

/// How the benchmarked binary formats its measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Labeled,
    KeyValue,
}

/// Parses both channel values out of one run's output
#[derive(Debug, Clone)]
pub struct MetricExtractor {
    labels: ChannelLabels,
    format: OutputFormat,
    pattern_a: Regex,
    pattern_b: Regex,
}

impl MetricExtractor {
    pub fn new(labels: ChannelLabels, format: OutputFormat) -> Result<Self, DriverError> {
        let pattern_a = labeled_pattern(&labels.channel_a)?;
        let pattern_b = labeled_pattern(&labels.channel_b)?;

        Ok(Self {
            labels,
            format,
            pattern_a,
            pattern_b,
        })
    }

    pub fn labels(&self) -> &ChannelLabels {
        &self.labels
    }

    /// Extract a `Sample` from `output`
    ///
    /// A missing field is an error; it is never read as zero.
    pub fn extract(&self, output: &str) -> Result<Sample, DriverError> {
        let (a, b) = match self.format {
            OutputFormat::Labeled => (
                find_labeled(&self.pattern_a, &self.labels.channel_a, output)?,
                find_labeled(&self.pattern_b, &self.labels.channel_b, output)?,
            ),
            OutputFormat::KeyValue => (
                find_key_value(&self.labels.channel_a, output)?,
                find_key_value(&self.labels.channel_b, output)?,
            ),
        };

        Ok(Sample {
            channel_a_ns: a,
            channel_b_ns: b,
        })
    }
}

fn labeled_pattern(label: &str) -> Result<Regex, DriverError> {
    let pattern = format!(
        r"\b{}:\s*([0-9]+(?:\.[0-9]*)?(?:[eE][+-]?[0-9]+)?)\s*ns\b",
        regex::escape(label)
    );
    Regex::new(&pattern).map_err(|e| DriverError::Usage(format!("invalid label `{}`: {}", label, e)))
}

fn find_labeled(pattern: &Regex, label: &str, output: &str) -> Result<f64, DriverError> {
    let value = pattern
        .captures(output)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| DriverError::MetricNotFound {
            label: label.to_string(),
        })?;
    parse_ns(label, value.as_str())
}

fn find_key_value(key: &str, output: &str) -> Result<f64, DriverError> {
    let value = output
        .lines()
        .filter_map(|line| line.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim())
        .ok_or_else(|| DriverError::MetricNotFound {
            label: key.to_string(),
        })?;

    let number = value.strip_suffix("ns").unwrap_or(value).trim_end();
    parse_ns(key, number)
}

fn parse_ns(label: &str, text: &str) -> Result<f64, DriverError> {
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(DriverError::InvalidMetric {
            label: label.to_string(),
            value: text.to_string(),
        }),
    }
}

/// Upper bound on samples reserved up front; run counts come from the command line
const MAX_RESERVED_SAMPLES: usize = 1024;

/// Samples retained from the measurement runs of one configuration
///
/// Warm-up samples never enter a series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeasurementSeries {
    samples: Vec<Sample>,
}

impl MeasurementSeries {
    /// Reserve room for `capacity` samples, up to `MAX_RESERVED_SAMPLES`
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity.min(MAX_RESERVED_SAMPLES)),
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Per-channel arithmetic mean, or `None` for an empty series
    pub fn aggregate(&self) -> Option<AggregateResult> {
        let a: Vec<f64> = self.samples.iter().map(|s| s.channel_a_ns).collect();
        let b: Vec<f64> = self.samples.iter().map(|s| s.channel_b_ns).collect();

        Some(AggregateResult {
            mean_a_ns: mean(&a)?,
            mean_b_ns: mean(&b)?,
            sample_count: self.samples.len(),
        })
    }
}

/// Mean latency of each channel over a measurement series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub mean_a_ns: f64,
    pub mean_b_ns: f64,
    pub sample_count: usize,
}

impl fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.3} ns / {:.3} ns over {} runs",
            self.mean_a_ns, self.mean_b_ns, self.sample_count
        )
    }
}
