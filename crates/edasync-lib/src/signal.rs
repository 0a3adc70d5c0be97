use chrono::DateTime;
use chrono_tz::Tz;

/// One EDA reading (microsiemens) at a zone-aware instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub instant: DateTime<Tz>,
    pub value: f64,
}

/// Normalized recording: time-ordered, finite samples in one display zone.
#[derive(Debug, Clone)]
pub struct CanonicalSeries {
    pub participant_id: String,
    /// Instant of the first sample.
    pub origin: DateTime<Tz>,
    pub samples: Vec<Sample>,
    /// `(instant[i] - origin)` in seconds; non-decreasing.
    pub seconds_from_start: Vec<f64>,
    /// 12-hour clock strings, one per sample.
    pub time_display: Vec<String>,
    /// Calendar date of the origin (`MM/DD/YYYY`).
    pub date_display: String,
    /// Data rows dropped because their EDA value was not a finite number or
    /// their clock cell was blank.
    pub dropped_rows: usize,
    /// False when instants come from the placeholder clock.
    pub measured_clock: bool,
}

impl CanonicalSeries {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn instants_rfc3339(&self) -> Vec<String> {
        self.samples.iter().map(|s| s.instant.to_rfc3339()).collect()
    }

    pub fn zone(&self) -> Tz {
        self.origin.timezone()
    }

    /// Elapsed seconds between first and last sample.
    pub fn duration(&self) -> f64 {
        self.seconds_from_start.last().copied().unwrap_or(0.0)
    }
}

/// Signed seconds from `from` to `to`, sub-second precision kept.
pub fn seconds_between(from: &DateTime<Tz>, to: &DateTime<Tz>) -> f64 {
    let delta = *to - *from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}
