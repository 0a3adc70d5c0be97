use crate::align::{align_video, window_range, StartTimeSource, VideoAlignment};
use crate::config::IngestSettings;
use crate::detectors::schema::{classify, ShapeClassification};
use crate::error::{IngestError, Warning};
use crate::io::csv::{decode_csv, RawTable};
use crate::io::video::{compatibility_warning, is_video_filename, start_time_from_filename};
use crate::metrics::stats::{summarize, summarize_all, Stats};
use crate::normalize::normalize;
use crate::signal::CanonicalSeries;
use crate::timestamps::resolve_instants;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// A classified and normalized recording.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub shape: ShapeClassification,
    pub series: CanonicalSeries,
    pub warnings: Vec<Warning>,
}

/// Classify, clock and normalize a decoded table.
pub fn ingest_table(table: RawTable, settings: &IngestSettings) -> Result<Ingested, IngestError> {
    let (candidate, shape) = classify(table, settings)?;
    let clock = resolve_instants(&candidate, &shape, settings);
    let skip = shape.data_start_row();
    let eda_cells = candidate
        .table
        .column(shape.eda_column(), skip)
        .unwrap_or_default();
    let participant_cells = match &shape {
        ShapeClassification::Headered {
            participant: Some(column),
            ..
        } => candidate.table.column(column, skip),
        _ => None,
    };
    let (series, normalize_warnings) = normalize(
        &eda_cells,
        &clock.instants,
        participant_cells.as_deref(),
        clock.measured,
        settings,
    )?;
    let mut warnings = clock.warnings;
    warnings.extend(normalize_warnings);
    debug!(
        "{} table: {} samples, {} dropped, participant {}",
        shape.label(),
        series.len(),
        series.dropped_rows,
        series.participant_id
    );
    Ok(Ingested {
        shape,
        series,
        warnings,
    })
}

/// Decode CSV bytes and ingest them.
pub fn ingest_bytes(bytes: &[u8], settings: &IngestSettings) -> Result<Ingested, IngestError> {
    ingest_table(decode_csv(bytes)?, settings)
}

/// One upload: the recording plus optional video metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadRequest<'a> {
    pub csv: &'a [u8],
    /// Original filename of the companion video, if one was uploaded. Names
    /// without a recognized video extension are ignored.
    pub video_filename: Option<&'a str>,
    /// Manually entered `HH:MM[:SS]` start time.
    pub video_start_time: Option<&'a str>,
    /// Playback length, once known, used to scope window statistics.
    pub video_duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub offset_seconds: f64,
    pub duration_seconds: f64,
    pub start_index: usize,
    /// Exclusive.
    pub end_index: usize,
    pub stats: Stats,
}

/// Payload handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub stats: Stats,
    pub participant_id: String,
    pub shape: String,
    pub video_offset_seconds: Option<f64>,
    pub video_start_source: StartTimeSource,
    pub video_info_message: Option<String>,
    pub data_points: usize,
    /// False when timestamps come from the placeholder clock.
    pub measured_clock: bool,
    pub timestamps: Vec<String>,
    pub timestamps_iso: Vec<String>,
    pub timestamps_seconds: Vec<f64>,
    pub eda_values: Vec<f64>,
    pub window: Option<WindowSummary>,
    pub warnings: Vec<String>,
}

/// Run one upload from raw bytes to response payload.
pub fn process_upload(
    request: &UploadRequest<'_>,
    settings: &IngestSettings,
) -> Result<UploadResponse, IngestError> {
    let Ingested {
        shape,
        series,
        mut warnings,
    } = ingest_bytes(request.csv, settings)?;
    let stats = summarize_all(&series).ok_or(IngestError::EmptySeries)?;

    let video_filename = request.video_filename.filter(|name| {
        let accepted = is_video_filename(name);
        if !accepted {
            warn!("ignoring '{}': not a recognized video file", name);
        }
        accepted
    });
    if let Some(warning) = video_filename.and_then(compatibility_warning) {
        warnings.push(warning);
    }
    let alignment = if video_filename.is_some() || request.video_start_time.is_some() {
        let (alignment, align_warnings) =
            align_video(video_filename, request.video_start_time, &series);
        warnings.extend(align_warnings);
        Some(alignment)
    } else {
        None
    };
    let video_info_message = alignment
        .as_ref()
        .and_then(|a| info_message(a, request.video_start_time, video_filename));

    let window = request.video_duration_seconds.and_then(|duration_seconds| {
        let offset_seconds = alignment.map(|a| a.offset_seconds).unwrap_or(0.0);
        let range = window_range(&series, offset_seconds, duration_seconds);
        summarize(&series, range.clone()).map(|stats| WindowSummary {
            offset_seconds,
            duration_seconds,
            start_index: range.start,
            end_index: range.end,
            stats,
        })
    });

    info!(
        "processed {} samples for participant {} ({} warnings)",
        series.len(),
        series.participant_id,
        warnings.len()
    );
    Ok(UploadResponse {
        stats,
        participant_id: series.participant_id.clone(),
        shape: shape.label().to_string(),
        video_offset_seconds: alignment.map(|a| a.offset_seconds),
        video_start_source: alignment
            .map(|a| a.source)
            .unwrap_or(StartTimeSource::None),
        video_info_message,
        data_points: series.len(),
        measured_clock: series.measured_clock,
        timestamps_iso: series.instants_rfc3339(),
        timestamps_seconds: series.seconds_from_start.clone(),
        eda_values: series.values(),
        timestamps: series.time_display,
        window,
        warnings: warnings.iter().map(ToString::to_string).collect(),
    })
}

fn info_message(
    alignment: &VideoAlignment,
    user_start_time: Option<&str>,
    video_filename: Option<&str>,
) -> Option<String> {
    match alignment.source {
        StartTimeSource::FilenameParsed => video_filename
            .and_then(start_time_from_filename)
            .map(|time| format!("Video start time auto-detected from filename: {}", time)),
        StartTimeSource::UserProvided => user_start_time
            .map(|time| format!("Using manually entered video start time: {}", time.trim())),
        StartTimeSource::None => None,
    }
}
