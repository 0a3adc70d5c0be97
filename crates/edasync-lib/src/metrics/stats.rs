use crate::normalize::format_date;
use crate::signal::CanonicalSeries;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Aggregate descriptors of a contiguous run of samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub mean: f64,
    /// Sample standard deviation (n - 1); `None` below two samples.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    /// Rows dropped from the recording before normalization.
    pub missing: usize,
    pub start_time: String,
    pub end_time: String,
    pub date: String,
    pub duration_seconds: f64,
}

/// Summarize `series.samples[range]`. Returns `None` for an empty range.
pub fn summarize(series: &CanonicalSeries, range: Range<usize>) -> Option<Stats> {
    let end = range.end.min(series.len());
    let start = range.start.min(end);
    if start == end {
        return None;
    }
    let values: Vec<f64> = series.samples[start..end].iter().map(|s| s.value).collect();
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let std = if n > 1 {
        Some((values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0)).sqrt())
    } else {
        None
    };
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(Stats {
        mean,
        std,
        min,
        max,
        count: n,
        missing: series.dropped_rows,
        start_time: series.time_display[start].clone(),
        end_time: series.time_display[end - 1].clone(),
        date: format_date(&series.samples[start].instant),
        duration_seconds: series.seconds_from_start[end - 1] - series.seconds_from_start[start],
    })
}

/// Summarize the whole series.
pub fn summarize_all(series: &CanonicalSeries) -> Option<Stats> {
    summarize(series, 0..series.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestSettings;
    use crate::normalize::normalize;
    use crate::timestamps::synthetic_instants;

    fn series(values: &[&str]) -> CanonicalSeries {
        let settings = IngestSettings::default();
        let clock = &settings.synthetic;
        let instants: Vec<_> = synthetic_instants(values.len(), clock, &settings.zone)
            .into_iter()
            .map(Some)
            .collect();
        normalize(values, &instants, None, false, &settings).unwrap().0
    }

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{} vs {} (tol {})", a, b, tol);
    }

    #[test]
    fn matches_sample_statistics() {
        let s = series(&["2", "4", "4", "4", "5", "5", "7", "9", ""]);
        let stats = summarize_all(&s).unwrap();
        assert_eq!(stats.count, 8);
        assert_eq!(stats.missing, 1);
        assert_close(stats.mean, 5.0, 1e-12);
        // population sd is 2.0; the n - 1 estimator gives sqrt(32 / 7)
        assert_close(stats.std.unwrap(), (32.0f64 / 7.0).sqrt(), 1e-12);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.duration_seconds, 420.0);
        assert_eq!(stats.start_time, "07:00:00 PM EST");
        assert_eq!(stats.end_time, "07:07:00 PM EST");
        assert_eq!(stats.date, "12/31/2024");
    }

    #[test]
    fn summarizing_twice_is_identical() {
        let s = series(&["0.3", "0.1", "0.2", "0.4"]);
        assert_eq!(summarize(&s, 1..3), summarize(&s, 1..3));
        assert_eq!(summarize_all(&s), summarize_all(&s));
    }

    #[test]
    fn single_sample_has_no_std() {
        let stats = summarize_all(&series(&["1.5"])).unwrap();
        assert_eq!(stats.std, None);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.duration_seconds, 0.0);
    }

    #[test]
    fn sub_range_and_empty_range() {
        let s = series(&["1", "2", "3", "4"]);
        let stats = summarize(&s, 1..3).unwrap();
        assert_eq!(stats.count, 2);
        assert_close(stats.mean, 2.5, 1e-12);
        assert_eq!(stats.start_time, "07:01:00 PM EST");
        assert!(summarize(&s, 2..2).is_none());
        assert_eq!(summarize(&s, 3..99).unwrap().count, 1);
    }
}
