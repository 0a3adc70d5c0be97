use crate::error::Warning;
use log::debug;
use regex::Regex;

/// Container extensions accepted alongside a recording.
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "webm", "ogg", "mov", "avi"];

const DATETIME_PATTERN: &str = r"(\d{4})-(\d{2})-(\d{2})[_-](\d{2})[_-](\d{2})[_-](\d{2})";

/// Extract the `HH:MM:SS` start time embedded in a camera export name such as
/// `SYS1Cam3--2018-05-14_10_22_27_frames_1-9470.mp4`.
pub fn start_time_from_filename(filename: &str) -> Option<String> {
    let pattern = Regex::new(DATETIME_PATTERN).ok()?;
    let Some(caps) = pattern.captures(filename) else {
        debug!("no start time pattern in video filename '{}'", filename);
        return None;
    };
    let time = format!("{}:{}:{}", &caps[4], &caps[5], &caps[6]);
    debug!("parsed video start time {} from '{}'", time, filename);
    Some(time)
}

/// Lower-cased extension of a filename, if it has one.
pub fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

pub fn is_video_filename(filename: &str) -> bool {
    extension(filename)
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Playback caveat for containers browsers handle poorly.
pub fn compatibility_warning(filename: &str) -> Option<Warning> {
    let ext = extension(filename)?;
    match ext.as_str() {
        "mp4" | "webm" | "ogg" => None,
        "avi" => Some(Warning::VideoFormat {
            message: "AVI format has limited browser support. If the video doesn't play, \
                      try a different browser. MP4 format is recommended for best \
                      compatibility across all browsers."
                .into(),
            extension: ext,
        }),
        _ => Some(Warning::VideoFormat {
            message: format!(
                "{} format may not play in all browsers. MP4 is recommended for best compatibility.",
                ext.to_ascii_uppercase()
            ),
            extension: ext,
        }),
    }
}
