//! Shape classification for uploaded EDA tables.
//!
//! Detection is an ordered list of [`ShapeDetector`] strategies. The first one
//! that recognizes the table wins; a new layout is supported by adding a
//! strategy to [`default_detectors`].

use crate::config::IngestSettings;
use crate::error::IngestError;
use crate::io::csv::{ColumnRef, RawTable};
use log::debug;
use regex::Regex;

/// Preferred EDA headers, highest priority first.
pub const EDA_COLUMN_NAMES: [&str; 6] = [
    "eda_scl_usiemens",
    "eda",
    "EDA",
    "skin_conductance",
    "scl",
    "electrodermal",
];
/// Millisecond UNIX-epoch clock column.
pub const UNIX_MS_COLUMN: &str = "timestamp_unix";
/// Generic clock headers, highest priority first.
pub const TIMESTAMP_COLUMN_NAMES: [&str; 4] = ["timestamp_iso", "timestamp", "time", "datetime"];
pub const PARTICIPANT_COLUMN: &str = "participant_full_id";

/// Unit applied when a clock column holds plain numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochUnit {
    Seconds,
    Milliseconds,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimestampColumn {
    pub column: ColumnRef,
    pub unit: EpochUnit,
}

/// Where the sampling rate of a metadata-bearing recording came from.
#[derive(Debug, Clone, PartialEq)]
pub enum RateSource {
    Metadata,
    /// Row 1 was missing (`raw == None`) or not a positive number.
    Default { raw: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeClassification {
    /// One unlabeled column: base UNIX timestamp, sampling rate, then samples.
    HeaderlessSingleColumnWithMetadata {
        eda: ColumnRef,
        base_timestamp: f64,
        sampling_rate_hz: f64,
        rate_source: RateSource,
    },
    /// One unlabeled column of samples only.
    HeaderlessSingleColumnNoMetadata { eda: ColumnRef },
    /// Unlabeled columns: clock in column 0, EDA in column 1.
    HeaderlessMultiColumn {
        timestamp: TimestampColumn,
        eda: ColumnRef,
    },
    Headered {
        eda: ColumnRef,
        timestamp: Option<TimestampColumn>,
        participant: Option<ColumnRef>,
    },
}

impl ShapeClassification {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeClassification::HeaderlessSingleColumnWithMetadata { .. } => {
                "headerless-single-column-with-metadata"
            }
            ShapeClassification::HeaderlessSingleColumnNoMetadata { .. } => {
                "headerless-single-column-no-metadata"
            }
            ShapeClassification::HeaderlessMultiColumn { .. } => "headerless-multi-column",
            ShapeClassification::Headered { .. } => "headered",
        }
    }

    pub fn eda_column(&self) -> &ColumnRef {
        match self {
            ShapeClassification::HeaderlessSingleColumnWithMetadata { eda, .. }
            | ShapeClassification::HeaderlessSingleColumnNoMetadata { eda }
            | ShapeClassification::HeaderlessMultiColumn { eda, .. }
            | ShapeClassification::Headered { eda, .. } => eda,
        }
    }

    /// Rows before this index are metadata, not samples.
    pub fn data_start_row(&self) -> usize {
        match self {
            ShapeClassification::HeaderlessSingleColumnWithMetadata { .. } => 2,
            _ => 0,
        }
    }
}

/// A table together with whether its first record was real header labels.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub table: RawTable,
    pub headerless: bool,
}

impl Candidate {
    /// Apply the header heuristic: when every label is a decimal numeral the
    /// source declared no header and the label row is data.
    pub fn from_table(table: RawTable) -> Self {
        if labels_are_numerals(&table.labels) {
            Candidate {
                table: table.into_headerless(),
                headerless: true,
            }
        } else {
            Candidate {
                table,
                headerless: false,
            }
        }
    }
}

pub fn labels_are_numerals(labels: &[String]) -> bool {
    let Ok(numeral) = Regex::new(r"^\d+\.?\d*$") else {
        return false;
    };
    !labels.is_empty() && labels.iter().all(|label| numeral.is_match(label))
}

/// One ingestion path. Returns `Ok(None)` when the table is not its shape.
pub trait ShapeDetector {
    fn name(&self) -> &'static str;
    fn detect(
        &self,
        candidate: &Candidate,
        settings: &IngestSettings,
    ) -> Result<Option<ShapeClassification>, IngestError>;
}

pub struct SingleColumnWithMetadata;
pub struct SingleColumnNoMetadata;
pub struct MultiColumnHeaderless;
pub struct HeaderedTable;

impl ShapeDetector for SingleColumnWithMetadata {
    fn name(&self) -> &'static str {
        "single-column-with-metadata"
    }

    fn detect(
        &self,
        candidate: &Candidate,
        settings: &IngestSettings,
    ) -> Result<Option<ShapeClassification>, IngestError> {
        if !candidate.headerless || candidate.table.width() != 1 {
            return Ok(None);
        }
        let table = &candidate.table;
        let base_timestamp = match table.cell(0, 0).and_then(parse_number) {
            Some(first) if first > settings.metadata_timestamp_threshold => first,
            _ => return Ok(None),
        };
        let raw_rate = table.cell(1, 0).map(str::to_string);
        let (sampling_rate_hz, rate_source) = match raw_rate.as_deref().and_then(parse_number) {
            Some(hz) if hz > 0.0 => (hz, RateSource::Metadata),
            _ => (
                settings.default_sampling_rate_hz,
                RateSource::Default { raw: raw_rate },
            ),
        };
        debug!(
            "metadata header: base timestamp {} at {} Hz",
            base_timestamp, sampling_rate_hz
        );
        Ok(Some(ShapeClassification::HeaderlessSingleColumnWithMetadata {
            eda: ColumnRef::Index(0),
            base_timestamp,
            sampling_rate_hz,
            rate_source,
        }))
    }
}

impl ShapeDetector for SingleColumnNoMetadata {
    fn name(&self) -> &'static str {
        "single-column-no-metadata"
    }

    fn detect(
        &self,
        candidate: &Candidate,
        _settings: &IngestSettings,
    ) -> Result<Option<ShapeClassification>, IngestError> {
        if !candidate.headerless || candidate.table.width() != 1 {
            return Ok(None);
        }
        Ok(Some(ShapeClassification::HeaderlessSingleColumnNoMetadata {
            eda: ColumnRef::Index(0),
        }))
    }
}

impl ShapeDetector for MultiColumnHeaderless {
    fn name(&self) -> &'static str {
        "multi-column-headerless"
    }

    fn detect(
        &self,
        candidate: &Candidate,
        _settings: &IngestSettings,
    ) -> Result<Option<ShapeClassification>, IngestError> {
        if !candidate.headerless || candidate.table.width() < 2 {
            return Ok(None);
        }
        Ok(Some(ShapeClassification::HeaderlessMultiColumn {
            timestamp: TimestampColumn {
                column: ColumnRef::Index(0),
                unit: EpochUnit::Seconds,
            },
            eda: ColumnRef::Index(1),
        }))
    }
}

impl ShapeDetector for HeaderedTable {
    fn name(&self) -> &'static str {
        "headered"
    }

    fn detect(
        &self,
        candidate: &Candidate,
        _settings: &IngestSettings,
    ) -> Result<Option<ShapeClassification>, IngestError> {
        if candidate.headerless {
            return Ok(None);
        }
        let table = &candidate.table;
        let eda = resolve_eda_column(table).ok_or_else(|| IngestError::NoEdaColumnFound {
            available: table.labels.clone(),
        })?;
        let timestamp = resolve_timestamp_column(table);
        let participant = table
            .has_label(PARTICIPANT_COLUMN)
            .then(|| ColumnRef::Name(PARTICIPANT_COLUMN.into()));
        Ok(Some(ShapeClassification::Headered {
            eda,
            timestamp,
            participant,
        }))
    }
}

fn resolve_eda_column(table: &RawTable) -> Option<ColumnRef> {
    EDA_COLUMN_NAMES
        .iter()
        .find(|name| table.has_label(name))
        .map(|name| name.to_string())
        .or_else(|| {
            table
                .labels
                .iter()
                .find(|label| label.to_lowercase().contains("eda"))
                .cloned()
        })
        .map(ColumnRef::Name)
}

fn resolve_timestamp_column(table: &RawTable) -> Option<TimestampColumn> {
    if table.has_label(UNIX_MS_COLUMN) {
        return Some(TimestampColumn {
            column: ColumnRef::Name(UNIX_MS_COLUMN.into()),
            unit: EpochUnit::Milliseconds,
        });
    }
    TIMESTAMP_COLUMN_NAMES
        .iter()
        .find(|name| table.has_label(name))
        .map(|name| TimestampColumn {
            column: ColumnRef::Name(name.to_string()),
            unit: EpochUnit::Seconds,
        })
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Detection strategies in priority order.
pub fn default_detectors() -> Vec<Box<dyn ShapeDetector>> {
    vec![
        Box::new(SingleColumnWithMetadata),
        Box::new(SingleColumnNoMetadata),
        Box::new(MultiColumnHeaderless),
        Box::new(HeaderedTable),
    ]
}

/// Classify a decoded table with an explicit strategy list.
pub fn classify_with(
    table: RawTable,
    detectors: &[Box<dyn ShapeDetector>],
    settings: &IngestSettings,
) -> Result<(Candidate, ShapeClassification), IngestError> {
    let candidate = Candidate::from_table(table);
    for detector in detectors {
        if let Some(shape) = detector.detect(&candidate, settings)? {
            debug!(
                "detector '{}' classified table as {} (eda: {})",
                detector.name(),
                shape.label(),
                shape.eda_column()
            );
            return Ok((candidate, shape));
        }
    }
    Err(IngestError::NoEdaColumnFound {
        available: candidate.table.labels.clone(),
    })
}

/// Classify a decoded table with [`default_detectors`].
pub fn classify(
    table: RawTable,
    settings: &IngestSettings,
) -> Result<(Candidate, ShapeClassification), IngestError> {
    classify_with(table, &default_detectors(), settings)
}
