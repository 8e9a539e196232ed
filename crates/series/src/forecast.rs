//! Linear forecast and time-to-completion estimate.

use crate::cache::Series;
use common::{ForecastPoint, Sample, SampleTime};
use std::fmt;
use tracing::warn;

/// Project `duration_minutes` minutes ahead of the last sample at `rate`
/// degrees per minute.
///
/// Yields `duration_minutes + 1` points; the first one repeats the last real
/// sample so the forecast line starts where the actual line ends. Empty when
/// the series is empty or its last key is not a recognised timestamp.
pub fn project(series: &Series, rate: f64, duration_minutes: u32) -> Vec<ForecastPoint> {
    let Some(last) = series.last() else {
        return Vec::new();
    };
    project_from(last, rate, duration_minutes).unwrap_or_else(|| {
        warn!("Cannot forecast from unrecognised timestamp {:?}", last.key);
        Vec::new()
    })
}

/// Project from a single anchor sample. `None` if its key does not parse.
pub fn project_from(last: &Sample, rate: f64, duration_minutes: u32) -> Option<Vec<ForecastPoint>> {
    let start = SampleTime::parse(&last.key)?;
    Some(
        (0..=duration_minutes)
            .map(|i| ForecastPoint {
                timestamp: start.plus_minutes(i),
                temperature: last.temperature + rate * f64::from(i),
            })
            .collect(),
    )
}

/// Estimated minutes until the target temperature is reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompletionEstimate {
    Minutes(f64),
    /// Target already passed, unreachable at the current rate, or rate is zero.
    NotApplicable,
}

impl CompletionEstimate {
    /// `(target - current) / rate`, without guarding the division.
    pub fn from_reading(target: f64, current: f64, rate: f64) -> Self {
        Self::from_minutes((target - current) / rate)
    }

    pub fn from_minutes(ttc: f64) -> Self {
        if ttc.is_finite() && ttc > 0.0 {
            Self::Minutes(ttc)
        } else {
            Self::NotApplicable
        }
    }

    pub fn minutes(&self) -> Option<f64> {
        match self {
            Self::Minutes(m) => Some(*m),
            Self::NotApplicable => None,
        }
    }
}

impl fmt::Display for CompletionEstimate {
    /// `HH:MM:SS`, or `N/A`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minutes(ttc) => {
                let hours = (ttc / 60.0).floor() as u64;
                let minutes = (ttc % 60.0).floor() as u64;
                let seconds = ((ttc % 1.0) * 60.0).floor() as u64;
                write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
            }
            Self::NotApplicable => f.write_str("N/A"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_of(items: &[(&str, f64)]) -> Series {
        Series::from_samples(items.iter().map(|(k, t)| Sample::new(*k, *t)))
    }

    fn rendered(points: &[ForecastPoint]) -> Vec<(String, f64)> {
        points
            .iter()
            .map(|p| (p.timestamp.to_string(), p.temperature))
            .collect()
    }

    #[test]
    fn test_projection_length_and_anchor() {
        let series = series_of(&[("2024-01-01 10:00:00", 70.0), ("2024-01-01 10:01:00", 71.0)]);

        let points = project(&series, 1.0, 2);

        assert_eq!(
            rendered(&points),
            vec![
                ("2024-01-01 10:01:00".to_string(), 71.0),
                ("2024-01-01 10:02:00".to_string(), 72.0),
                ("2024-01-01 10:03:00".to_string(), 73.0),
            ]
        );
    }

    #[test]
    fn test_projection_points_follow_rate() {
        let anchor = Sample::new("2024-03-10T08:30:00Z", 150.0);
        let points = project_from(&anchor, -0.25, 30).expect("anchor parses");

        assert_eq!(points.len(), 31);
        let start = SampleTime::parse(&anchor.key).unwrap();
        for (i, point) in points.iter().enumerate() {
            let i = i as u32;
            assert_eq!(point.timestamp, start.plus_minutes(i));
            let expected = 150.0 - 0.25 * f64::from(i);
            assert!((point.temperature - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_duration_is_single_anchor_point() {
        let series = series_of(&[("2024-01-01 10:00:00", 70.0)]);
        let points = project(&series, 3.0, 0);
        assert_eq!(rendered(&points), vec![("2024-01-01 10:00:00".to_string(), 70.0)]);
    }

    #[test]
    fn test_projection_empty_cases() {
        assert!(project(&Series::new(), 1.0, 10).is_empty());
        assert!(project(&series_of(&[("sample-7", 70.0)]), 1.0, 10).is_empty());
    }

    #[test]
    fn test_completion_formatting() {
        assert_eq!(CompletionEstimate::from_minutes(90.0).to_string(), "01:30:00");
        assert_eq!(CompletionEstimate::from_minutes(0.5).to_string(), "00:00:30");
        assert_eq!(CompletionEstimate::from_minutes(61.25).to_string(), "01:01:15");
        assert_eq!(CompletionEstimate::from_minutes(6000.0).to_string(), "100:00:00");
    }

    #[test]
    fn test_completion_not_applicable() {
        // rate = 0, target != current
        assert_eq!(
            CompletionEstimate::from_reading(165.0, 70.0, 0.0).to_string(),
            "N/A"
        );
        // 0 / 0
        assert_eq!(
            CompletionEstimate::from_reading(70.0, 70.0, 0.0),
            CompletionEstimate::NotApplicable
        );
        // Cooling away from the target.
        assert_eq!(
            CompletionEstimate::from_reading(165.0, 70.0, -1.0).to_string(),
            "N/A"
        );
        assert_eq!(CompletionEstimate::from_minutes(0.0).minutes(), None);
    }

    #[test]
    fn test_completion_from_reading() {
        let estimate = CompletionEstimate::from_reading(160.0, 70.0, 1.0);
        assert_eq!(estimate.minutes(), Some(90.0));
        assert_eq!(estimate.to_string(), "01:30:00");
    }
}
