use crate::config::IngestSettings;
use crate::error::{IngestError, Warning};
use crate::signal::{seconds_between, CanonicalSeries, Sample};
use chrono::DateTime;
use chrono_tz::Tz;
use log::{debug, warn};

pub const UNKNOWN_PARTICIPANT: &str = "Unknown";

/// Coerce one EDA cell; anything but a finite number is invalid.
pub fn coerce_value(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Display string for one instant, e.g. `02:05:09 PM EST`.
pub fn format_time(instant: &DateTime<Tz>, zone_label: &str) -> String {
    format!("{} {}", instant.format("%I:%M:%S %p"), zone_label)
}

pub fn format_date(instant: &DateTime<Tz>) -> String {
    instant.format("%m/%d/%Y").to_string()
}

/// Build the canonical series from raw EDA cells and their row instants.
///
/// `participant_cells`, when present, is aligned with `eda_cells`; the first
/// non-blank value on a surviving row becomes the participant id. Rows whose
/// EDA cell fails coercion, or which have no instant, are dropped and
/// counted. Fails with
/// [`IngestError::EmptySeries`] when nothing survives.
pub fn normalize(
    eda_cells: &[&str],
    instants: &[Option<DateTime<Tz>>],
    participant_cells: Option<&[&str]>,
    measured_clock: bool,
    settings: &IngestSettings,
) -> Result<(CanonicalSeries, Vec<Warning>), IngestError> {
    let mut warnings = Vec::new();
    let mut samples = Vec::with_capacity(eda_cells.len());
    let mut participant_id = None;
    for (row, (cell, instant)) in eda_cells.iter().zip(instants).enumerate() {
        let (Some(value), Some(instant)) = (coerce_value(cell), instant) else {
            continue;
        };
        if participant_id.is_none() {
            participant_id = participant_cells
                .and_then(|cells| cells.get(row))
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
                .map(str::to_string);
        }
        samples.push(Sample {
            instant: *instant,
            value,
        });
    }
    let dropped_rows = eda_cells.len() - samples.len();
    if samples.is_empty() {
        return Err(IngestError::EmptySeries);
    }
    if dropped_rows > 0 {
        debug!("dropped {} rows without a usable value or instant", dropped_rows);
    }
    if samples.windows(2).any(|w| w[1].instant < w[0].instant) {
        warn!("samples out of time order; sorting");
        samples.sort_by_key(|s| s.instant);
        warnings.push(Warning::SamplesReordered);
    }

    let origin = samples[0].instant;
    let seconds_from_start = samples
        .iter()
        .map(|s| seconds_between(&origin, &s.instant))
        .collect();
    let time_display = samples
        .iter()
        .map(|s| format_time(&s.instant, &settings.zone_label))
        .collect();
    let series = CanonicalSeries {
        participant_id: participant_id.unwrap_or_else(|| UNKNOWN_PARTICIPANT.to_string()),
        origin,
        date_display: format_date(&origin),
        samples,
        seconds_from_start,
        time_display,
        dropped_rows,
        measured_clock,
    };
    Ok((series, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamps::synthetic_instants;
    use chrono::{TimeZone, Utc};

    fn clock(rows: usize) -> Vec<Option<DateTime<Tz>>> {
        let settings = IngestSettings::default();
        synthetic_instants(rows, &settings.synthetic, &settings.zone)
            .into_iter()
            .map(Some)
            .collect()
    }

    #[test]
    fn drops_invalid_cells_without_zero_fill() {
        let cells = ["0.5", "", "abc", "NaN", "0.7", "inf"];
        let (series, warnings) =
            normalize(&cells, &clock(6), None, false, &IngestSettings::default()).unwrap();
        assert_eq!(series.values(), vec![0.5, 0.7]);
        assert_eq!(series.dropped_rows, 4);
        assert_eq!(series.participant_id, UNKNOWN_PARTICIPANT);
        assert_eq!(series.seconds_from_start, vec![0.0, 240.0]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn empty_series_is_an_error() {
        let cells = ["x", ""];
        let err = normalize(&cells, &clock(2), None, false, &IngestSettings::default());
        assert!(matches!(err, Err(IngestError::EmptySeries)));
    }

    #[test]
    fn participant_from_first_surviving_row() {
        let cells = ["bad", "1.0", "2.0"];
        let ids = ["P-skip", "P-042", "P-042"];
        let (series, _) =
            normalize(&cells, &clock(3), Some(&ids[..]), true, &IngestSettings::default()).unwrap();
        assert_eq!(series.participant_id, "P-042");
    }

    #[test]
    fn display_strings() {
        let settings = IngestSettings::default();
        let instant = Utc
            .with_ymd_and_hms(2018, 5, 14, 14, 22, 27)
            .unwrap()
            .with_timezone(&settings.zone);
        let (series, _) = normalize(&["3.2"], &[Some(instant)], None, true, &settings).unwrap();
        assert_eq!(series.time_display, vec!["10:22:27 AM EST"]);
        assert_eq!(series.date_display, "05/14/2018");
    }

    #[test]
    fn rows_without_instant_are_missing() {
        let mut instants = clock(3);
        instants[1] = None;
        let (series, _) =
            normalize(&["1", "2", "3"], &instants, None, true, &IngestSettings::default()).unwrap();
        assert_eq!(series.values(), vec![1.0, 3.0]);
        assert_eq!(series.dropped_rows, 1);
        assert_eq!(series.seconds_from_start, vec![0.0, 120.0]);
    }

    #[test]
    fn unordered_rows_are_sorted() {
        let mut instants = clock(3);
        instants.swap(0, 2);
        let (series, warnings) = normalize(
            &["3", "2", "1"],
            &instants,
            None,
            true,
            &IngestSettings::default(),
        )
        .unwrap();
        assert_eq!(series.values(), vec![1.0, 2.0, 3.0]);
        assert!(series.seconds_from_start.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(warnings, vec![Warning::SamplesReordered]);
    }
}
