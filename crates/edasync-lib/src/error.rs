use std::fmt;
use thiserror::Error;

/// Fatal conditions that abort processing of one upload.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input could not be decoded as CSV: {reason}")]
    MalformedInput { reason: String },
    #[error("No EDA column found in CSV file. Available columns: {}", .available.join(", "))]
    NoEdaColumnFound { available: Vec<String> },
    #[error("No valid EDA data found in file")]
    EmptySeries,
    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        IngestError::MalformedInput {
            reason: err.to_string(),
        }
    }
}

/// Degraded-but-successful conditions reported next to a result.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    TimestampParseDegraded { column: String, reason: String },
    SyntheticClock { reason: String },
    SamplingRateDefaulted { raw: String, used_hz: f64 },
    SamplesReordered,
    VideoOffsetUnresolved { start_time: String, reason: String },
    VideoFormat { extension: String, message: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::TimestampParseDegraded { column, reason } => write!(
                f,
                "timestamp column '{}' could not be parsed ({}); using a synthetic 1-minute clock",
                column, reason
            ),
            Warning::SyntheticClock { reason } => {
                write!(f, "{}; timestamps are placeholders, not measured times", reason)
            }
            Warning::SamplingRateDefaulted { raw, used_hz } => write!(
                f,
                "sampling rate '{}' is not a positive number; assuming {} Hz",
                raw, used_hz
            ),
            Warning::SamplesReordered => {
                write!(f, "samples were not in time order and have been sorted")
            }
            Warning::VideoOffsetUnresolved { start_time, reason } => write!(
                f,
                "could not resolve video start time '{}' ({}); offset defaults to 0",
                start_time, reason
            ),
            Warning::VideoFormat { message, .. } => f.write_str(message),
        }
    }
}
