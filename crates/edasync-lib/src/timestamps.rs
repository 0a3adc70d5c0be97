use crate::config::{IngestSettings, SyntheticClock};
use crate::detectors::schema::{
    Candidate, EpochUnit, RateSource, ShapeClassification, TimestampColumn,
};
use crate::error::Warning;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use log::{debug, warn};

const ZONED_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

const NAIVE_FORMATS: [&str; 11] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%d.%m.%Y %H:%M:%S%.f",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Per-row instants for a classified table, in the display zone.
#[derive(Debug, Clone)]
pub struct ResolvedClock {
    /// `None` for rows whose clock cell was blank.
    pub instants: Vec<Option<DateTime<Tz>>>,
    /// False when the synthetic placeholder clock was used.
    pub measured: bool,
    pub warnings: Vec<Warning>,
}

/// Produce one instant per data row of `candidate` according to `shape`.
pub fn resolve_instants(
    candidate: &Candidate,
    shape: &ShapeClassification,
    settings: &IngestSettings,
) -> ResolvedClock {
    let rows = candidate
        .table
        .len()
        .saturating_sub(shape.data_start_row());
    match shape {
        ShapeClassification::HeaderlessSingleColumnWithMetadata {
            base_timestamp,
            sampling_rate_hz,
            rate_source,
            ..
        } => {
            let mut warnings = Vec::new();
            if let RateSource::Default { raw: Some(raw) } = rate_source {
                warn!("sampling rate '{}' unusable, assuming {} Hz", raw, sampling_rate_hz);
                warnings.push(Warning::SamplingRateDefaulted {
                    raw: raw.clone(),
                    used_hz: *sampling_rate_hz,
                });
            }
            let step = 1.0 / sampling_rate_hz;
            let instants: Option<Vec<_>> = (0..rows)
                .map(|i| from_unix_seconds(base_timestamp + i as f64 * step))
                .map(|utc| utc.map(|t| t.with_timezone(&settings.zone)))
                .collect();
            match instants {
                Some(instants) => ResolvedClock {
                    instants: instants.into_iter().map(Some).collect(),
                    measured: true,
                    warnings,
                },
                None => {
                    warnings.push(Warning::TimestampParseDegraded {
                        column: "metadata header".into(),
                        reason: format!("base timestamp {} is out of range", base_timestamp),
                    });
                    synthetic(rows, settings, warnings)
                }
            }
        }
        ShapeClassification::HeaderlessSingleColumnNoMetadata { .. } => synthetic(
            rows,
            settings,
            vec![Warning::SyntheticClock {
                reason: "single unlabeled column without a metadata header".into(),
            }],
        ),
        ShapeClassification::HeaderlessMultiColumn { timestamp, .. } => {
            resolve_column(candidate, timestamp, rows, settings)
        }
        ShapeClassification::Headered {
            timestamp: Some(timestamp),
            ..
        } => resolve_column(candidate, timestamp, rows, settings),
        ShapeClassification::Headered {
            timestamp: None, ..
        } => synthetic(
            rows,
            settings,
            vec![Warning::SyntheticClock {
                reason: "no timestamp column found".into(),
            }],
        ),
    }
}

fn resolve_column(
    candidate: &Candidate,
    timestamp: &TimestampColumn,
    rows: usize,
    settings: &IngestSettings,
) -> ResolvedClock {
    let cells = candidate.table.column(&timestamp.column, 0).unwrap_or_default();
    match parse_clock_cells(&cells, timestamp.unit) {
        Ok(utc) => {
            let holes = utc.iter().filter(|t| t.is_none()).count();
            debug!(
                "resolved {} instants from {} ({} blank)",
                utc.len() - holes,
                timestamp.column,
                holes
            );
            ResolvedClock {
                instants: utc
                    .iter()
                    .map(|t| t.map(|t| t.with_timezone(&settings.zone)))
                    .collect(),
                measured: true,
                warnings: Vec::new(),
            }
        }
        Err(reason) => {
            warn!("timestamp column {} degraded: {}", timestamp.column, reason);
            synthetic(
                rows,
                settings,
                vec![Warning::TimestampParseDegraded {
                    column: timestamp.column.to_string(),
                    reason,
                }],
            )
        }
    }
}

/// Interpret a clock column: when every non-blank cell is numeric the column
/// holds epoch offsets in `unit`, otherwise cells go through text date/time
/// parsing. Blank cells are holes (`None`); any other unparseable cell fails
/// the whole column, as does a column with no values at all.
pub fn parse_clock_cells(
    cells: &[&str],
    unit: EpochUnit,
) -> Result<Vec<Option<DateTime<Utc>>>, String> {
    let cells: Vec<Option<&str>> = cells
        .iter()
        .map(|c| Some(c.trim()).filter(|c| !c.is_empty()))
        .collect();
    if cells.iter().all(Option::is_none) {
        return Err("column has no values".into());
    }
    let numbers: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| match cell {
            Some(text) => text.parse::<f64>().ok().map(Some),
            None => Some(None),
        })
        .collect();
    if let Some(numbers) = numbers {
        return numbers
            .iter()
            .enumerate()
            .map(|(row, value)| {
                let Some(value) = value else {
                    return Ok(None);
                };
                let seconds = match unit {
                    EpochUnit::Seconds => *value,
                    EpochUnit::Milliseconds => value / 1000.0,
                };
                from_unix_seconds(seconds).map(Some).ok_or_else(|| {
                    format!("epoch value {} at row {} is out of range", value, row + 1)
                })
            })
            .collect();
    }
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            Some(text) => parse_datetime_text(text)
                .map(Some)
                .ok_or_else(|| format!("unrecognized timestamp '{}' at row {}", text, row + 1)),
            None => Ok(None),
        })
        .collect()
}

/// Parse one textual timestamp. Values without zone information are UTC.
pub fn parse_datetime_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    None
}

/// UNIX seconds (fractional) to a UTC instant, `None` when out of range.
pub fn from_unix_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let mut nanos = ((seconds - whole) * 1e9).round() as i64;
    let mut secs = whole as i64;
    if nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    DateTime::from_timestamp(secs, nanos as u32)
}

/// The placeholder timeline: `origin + i * interval`, in the display zone.
pub fn synthetic_instants(rows: usize, clock: &SyntheticClock, zone: &Tz) -> Vec<DateTime<Tz>> {
    let step_us = (clock.interval_s * 1e6).round() as i64;
    (0..rows)
        .map(|i| {
            let offset = chrono::Duration::microseconds(step_us.saturating_mul(i as i64));
            (clock.origin + offset).with_timezone(zone)
        })
        .collect()
}

fn synthetic(rows: usize, settings: &IngestSettings, warnings: Vec<Warning>) -> ResolvedClock {
    ResolvedClock {
        instants: synthetic_instants(rows, &settings.synthetic, &settings.zone)
            .into_iter()
            .map(Some)
            .collect(),
        measured: false,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::schema::classify;
    use crate::io::csv::decode_csv;

    fn resolve(bytes: &[u8]) -> ResolvedClock {
        let settings = IngestSettings::default();
        let (candidate, shape) = classify(decode_csv(bytes).unwrap(), &settings).unwrap();
        resolve_instants(&candidate, &shape, &settings)
    }

    fn at(clock: &ResolvedClock, row: usize) -> DateTime<Tz> {
        clock.instants[row].expect("instant")
    }

    #[test]
    fn metadata_clock_steps_by_sampling_rate() {
        let clock = resolve(b"1583412345\n4\n0.1\n0.2\n0.3\n");
        assert!(clock.measured);
        assert_eq!(clock.instants.len(), 3);
        let first = at(&clock, 0).with_timezone(&Utc);
        assert_eq!(first.timestamp(), 1583412345);
        let step = at(&clock, 1) - at(&clock, 0);
        assert_eq!(step.num_milliseconds(), 250);
        assert_eq!(at(&clock, 0).timezone(), chrono_tz::US::Eastern);
    }

    #[test]
    fn synthetic_clock_for_bare_column() {
        let clock = resolve(b"0.5\n0.6\n0.7\n");
        assert!(!clock.measured);
        assert_eq!(clock.instants.len(), 3);
        assert_eq!(
            at(&clock, 0).with_timezone(&Utc).to_rfc3339(),
            "2025-01-01T00:00:00+00:00"
        );
        // 2025-01-01 00:00 UTC is 19:00 the previous evening in New York.
        assert_eq!(at(&clock, 0).format("%Y-%m-%d %H:%M").to_string(), "2024-12-31 19:00");
        assert_eq!((at(&clock, 2) - at(&clock, 0)).num_minutes(), 2);
        assert!(matches!(clock.warnings[0], Warning::SyntheticClock { .. }));
    }

    #[test]
    fn headerless_multi_column_uses_epoch_seconds() {
        let clock = resolve(b"1700000000,0.5\n1700000001.5,0.6\n");
        assert!(clock.measured);
        assert_eq!((at(&clock, 1) - at(&clock, 0)).num_milliseconds(), 1500);
    }

    #[test]
    fn unix_ms_column() {
        let clock = resolve(b"timestamp_unix,eda\n1700000000000,1\n1700000000250,2\n");
        assert_eq!(at(&clock, 0).with_timezone(&Utc).timestamp(), 1_700_000_000);
        assert_eq!((at(&clock, 1) - at(&clock, 0)).num_milliseconds(), 250);
    }

    #[test]
    fn iso_texts_with_and_without_offset() {
        let clock = resolve(
            b"timestamp_iso,eda\n2024-03-01T10:00:00Z,1\n2024-03-01 05:00:30-05:00,2\n2024-03-01 10:01:00,3\n",
        );
        assert!(clock.measured);
        let secs: Vec<i64> = clock
            .instants
            .iter()
            .map(|t| (t.expect("instant") - at(&clock, 0)).num_seconds())
            .collect();
        assert_eq!(secs, vec![0, 30, 60]);
    }

    #[test]
    fn blank_clock_cells_are_holes() {
        let clock = resolve(
            b"timestamp_iso,eda,participant_full_id\n2024-03-01T10:00:00Z,0.41,P1\n2024-03-01T10:00:15Z,0.42,P1\n,,\n",
        );
        assert!(clock.measured);
        assert!(clock.warnings.is_empty());
        assert_eq!(clock.instants.len(), 3);
        assert_eq!(at(&clock, 0).with_timezone(&Utc).timestamp(), 1_709_287_200);
        assert!(clock.instants[2].is_none());
    }

    #[test]
    fn blank_cells_keep_numeric_epoch_column() {
        let clock = resolve(b"1709287200,0.41\n1709287201,0.42\n,\n");
        assert!(clock.measured);
        assert!(clock.warnings.is_empty());
        assert_eq!((at(&clock, 1) - at(&clock, 0)).num_seconds(), 1);
        assert!(clock.instants[2].is_none());
    }

    #[test]
    fn all_blank_column_degrades() {
        assert!(parse_clock_cells(&["", " "], EpochUnit::Seconds).is_err());
    }

    #[test]
    fn unparseable_column_degrades() {
        let clock = resolve(b"time,eda\nmorning,1\nnoon,2\n");
        assert!(!clock.measured);
        assert_eq!(clock.instants.len(), 2);
        match &clock.warnings[0] {
            Warning::TimestampParseDegraded { column, reason } => {
                assert_eq!(column, "time");
                assert!(reason.contains("morning"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn headered_without_clock_matches_bare_column_clock() {
        let headered = resolve(b"eda\n0.5\n0.6\n");
        let bare = resolve(b"0.5\n0.6\n");
        assert_eq!(headered.instants, bare.instants);
    }

    #[test]
    fn injectable_zone() {
        let settings = IngestSettings::default().with_zone(chrono_tz::UTC, "UTC");
        let (candidate, shape) =
            classify(decode_csv(b"0.1\n0.2\n").unwrap(), &settings).unwrap();
        let clock = resolve_instants(&candidate, &shape, &settings);
        assert_eq!(at(&clock, 0).format("%H:%M").to_string(), "00:00");
    }

    #[test]
    fn text_formats() {
        let expect = |text: &str, rfc: &str| {
            assert_eq!(
                parse_datetime_text(text).map(|t| t.to_rfc3339()).as_deref(),
                Some(rfc),
                "{}",
                text
            );
        };
        expect("2024-03-01T10:00:00.500Z", "2024-03-01T10:00:00.500+00:00");
        expect("2024-03-01 10:00", "2024-03-01T10:00:00+00:00");
        expect("03/01/2024 01:15:00 PM", "2024-03-01T13:15:00+00:00");
        expect("2024-03-01", "2024-03-01T00:00:00+00:00");
        assert!(parse_datetime_text("").is_none());
        assert!(parse_datetime_text("yesterday").is_none());
    }

    #[test]
    fn fractional_epoch_rounding() {
        let t = from_unix_seconds(1.9999999999).unwrap();
        assert_eq!(t.timestamp(), 2);
        assert!(from_unix_seconds(f64::NAN).is_none());
    }
}
