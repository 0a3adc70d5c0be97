//! Video-to-recording time alignment.

use crate::error::Warning;
use crate::io::video::start_time_from_filename;
use crate::signal::{seconds_between, CanonicalSeries};
use chrono::{NaiveTime, TimeZone};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Where the video start time used for alignment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartTimeSource {
    FilenameParsed,
    UserProvided,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartTimeCandidate {
    pub time: String,
    pub source: StartTimeSource,
}

/// Seconds after the recording origin at which the video begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoAlignment {
    pub offset_seconds: f64,
    pub source: StartTimeSource,
}

impl VideoAlignment {
    pub fn unresolved() -> Self {
        Self {
            offset_seconds: 0.0,
            source: StartTimeSource::None,
        }
    }
}

/// Pick the start time to align with. A non-blank user-entered time wins over
/// one embedded in the filename.
pub fn choose_start_time(
    video_filename: Option<&str>,
    user_start_time: Option<&str>,
) -> Option<StartTimeCandidate> {
    if let Some(user) = user_start_time.map(str::trim).filter(|t| !t.is_empty()) {
        return Some(StartTimeCandidate {
            time: user.to_string(),
            source: StartTimeSource::UserProvided,
        });
    }
    video_filename
        .and_then(start_time_from_filename)
        .map(|time| StartTimeCandidate {
            time,
            source: StartTimeSource::FilenameParsed,
        })
}

/// Parse `HH:MM` or `HH:MM:SS`; missing seconds are `:00`.
pub fn parse_clock_time(text: &str) -> Result<NaiveTime, String> {
    let text = text.trim();
    let full = match text.split(':').count() {
        2 => format!("{}:00", text),
        3 => text.to_string(),
        _ => return Err(format!("expected HH:MM or HH:MM:SS, got '{}'", text)),
    };
    NaiveTime::parse_from_str(&full, "%H:%M:%S").map_err(|err| format!("'{}': {}", text, err))
}

/// Signed seconds from the series origin to `start_time` on the origin's
/// calendar date, both in the series' zone.
pub fn compute_offset(start_time: &str, series: &CanonicalSeries) -> Result<f64, String> {
    let time = parse_clock_time(start_time)?;
    let zone = series.zone();
    let local = series.origin.date_naive().and_time(time);
    let video_start = zone
        .from_local_datetime(&local)
        .earliest()
        .ok_or_else(|| format!("{} does not exist in {}", local, zone))?;
    let offset = seconds_between(&series.origin, &video_start);
    debug!(
        "data start {}, video start {}, offset {:.3} s ({:.2} min)",
        series.origin,
        video_start,
        offset,
        offset / 60.0
    );
    Ok(offset)
}

/// Resolve the alignment for an optional video. Failures degrade to a zero
/// offset with a [`Warning::VideoOffsetUnresolved`].
pub fn align_video(
    video_filename: Option<&str>,
    user_start_time: Option<&str>,
    series: &CanonicalSeries,
) -> (VideoAlignment, Vec<Warning>) {
    let Some(candidate) = choose_start_time(video_filename, user_start_time) else {
        debug!("no video start time available");
        return (VideoAlignment::unresolved(), Vec::new());
    };
    match compute_offset(&candidate.time, series) {
        Ok(offset_seconds) => (
            VideoAlignment {
                offset_seconds,
                source: candidate.source,
            },
            Vec::new(),
        ),
        Err(reason) => {
            warn!("could not resolve video start time: {}", reason);
            (
                VideoAlignment::unresolved(),
                vec![Warning::VideoOffsetUnresolved {
                    start_time: candidate.time,
                    reason,
                }],
            )
        }
    }
}

/// Sample indices whose `seconds_from_start` falls inside
/// `[offset, offset + duration]`. An empty or undefined window yields the
/// full range.
pub fn window_range(
    series: &CanonicalSeries,
    offset_seconds: f64,
    duration_seconds: f64,
) -> Range<usize> {
    let full = 0..series.len();
    if !(offset_seconds.is_finite() && duration_seconds.is_finite()) || duration_seconds < 0.0 {
        return full;
    }
    let end_seconds = offset_seconds + duration_seconds;
    let secs = &series.seconds_from_start;
    let start = secs.partition_point(|s| *s < offset_seconds);
    let end = secs.partition_point(|s| *s <= end_seconds);
    if start >= end {
        debug!(
            "window [{}, {}] s holds no samples; keeping full series",
            offset_seconds, end_seconds
        );
        return full;
    }
    start..end
}
