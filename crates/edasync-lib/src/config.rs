use crate::error::IngestError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// User-facing pipeline configuration, as read from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// IANA zone every instant is expressed in.
    pub display_zone: String,
    /// Suffix appended to 12-hour display strings.
    pub zone_label: String,
    /// First instant of the placeholder clock (RFC 3339).
    pub synthetic_origin: String,
    /// Spacing of the placeholder clock (seconds).
    pub synthetic_interval_s: f64,
    /// Rate assumed when a metadata header omits it (Hz).
    pub default_sampling_rate_hz: f64,
    /// First cells above this are read as a UNIX-seconds base timestamp.
    pub metadata_timestamp_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            display_zone: "US/Eastern".into(),
            zone_label: "EST".into(),
            synthetic_origin: "2025-01-01T00:00:00Z".into(),
            synthetic_interval_s: 60.0,
            default_sampling_rate_hz: 4.0,
            metadata_timestamp_threshold: 1_000_000_000.0,
        }
    }
}

impl PipelineConfig {
    /// Validate and convert into the typed settings the engine consumes.
    pub fn resolve(&self) -> Result<IngestSettings, IngestError> {
        let zone: Tz = self.display_zone.parse().map_err(|err| IngestError::Config {
            reason: format!("unknown display zone '{}': {}", self.display_zone, err),
        })?;
        let origin = DateTime::parse_from_rfc3339(&self.synthetic_origin)
            .map_err(|err| IngestError::Config {
                reason: format!(
                    "synthetic_origin '{}' is not RFC 3339: {}",
                    self.synthetic_origin, err
                ),
            })?
            .with_timezone(&Utc);
        if !(self.synthetic_interval_s.is_finite() && self.synthetic_interval_s > 0.0) {
            return Err(IngestError::Config {
                reason: "synthetic_interval_s must be positive".into(),
            });
        }
        if !(self.default_sampling_rate_hz.is_finite() && self.default_sampling_rate_hz > 0.0) {
            return Err(IngestError::Config {
                reason: "default_sampling_rate_hz must be positive".into(),
            });
        }
        Ok(IngestSettings {
            zone,
            zone_label: self.zone_label.clone(),
            synthetic: SyntheticClock {
                origin,
                interval_s: self.synthetic_interval_s,
            },
            default_sampling_rate_hz: self.default_sampling_rate_hz,
            metadata_timestamp_threshold: self.metadata_timestamp_threshold,
        })
    }
}

/// Placeholder timeline used when no measured clock is available.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticClock {
    pub origin: DateTime<Utc>,
    pub interval_s: f64,
}

/// Validated settings threaded through every stage of ingestion.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub zone: Tz,
    pub zone_label: String,
    pub synthetic: SyntheticClock,
    pub default_sampling_rate_hz: f64,
    pub metadata_timestamp_threshold: f64,
}

impl IngestSettings {
    /// Same settings, expressed in a different target zone.
    pub fn with_zone(mut self, zone: Tz, label: impl Into<String>) -> Self {
        self.zone = zone;
        self.zone_label = label.into();
        self
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            zone: chrono_tz::US::Eastern,
            zone_label: "EST".into(),
            synthetic: SyntheticClock {
                // 2025-01-01T00:00:00Z
                origin: DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default(),
                interval_s: 60.0,
            },
            default_sampling_rate_hz: 4.0,
            metadata_timestamp_threshold: 1_000_000_000.0,
        }
    }
}

/// Read a TOML pipeline configuration; missing keys take their defaults.
pub fn load_config(path: &Path) -> Result<PipelineConfig, IngestError> {
    let contents = fs::read_to_string(path).map_err(|err| IngestError::Config {
        reason: format!("failed to read {}: {}", path.display(), err),
    })?;
    toml::from_str(&contents).map_err(|err| IngestError::Config {
        reason: format!("parsing {}: {}", path.display(), err),
    })
}
