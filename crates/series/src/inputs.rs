//! Sources for the forecast duration and target temperature.

use common::config::MAX_FORECAST_MINUTES;
use common::{Error, ForecastInputs, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Read once at the start of every refresh cycle.
pub trait InputSource: Send + Sync {
    fn read(&self) -> Result<ForecastInputs>;
}

/// Fixed values, typically from config or the command line.
#[derive(Debug, Clone, Copy)]
pub struct StaticInputs(pub ForecastInputs);

impl InputSource for StaticInputs {
    fn read(&self) -> Result<ForecastInputs> {
        Ok(self.0)
    }
}

/// Values from a small TOML file that may be edited while the monitor runs.
///
/// ```toml
/// forecast_duration_minutes = 20
/// target_temperature = 160.0
/// ```
///
/// Missing file or missing fields fall back to `defaults`. Horizons above
/// [`MAX_FORECAST_MINUTES`] and non-finite targets are rejected.
#[derive(Debug, Clone)]
pub struct FileInputs {
    path: PathBuf,
    defaults: ForecastInputs,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InputsFile {
    forecast_duration_minutes: Option<u32>,
    target_temperature: Option<f64>,
}

impl FileInputs {
    pub fn new(path: impl Into<PathBuf>, defaults: ForecastInputs) -> Self {
        Self {
            path: path.into(),
            defaults,
        }
    }
}

impl InputSource for FileInputs {
    fn read(&self) -> Result<ForecastInputs> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(self.defaults),
            Err(e) => return Err(e.into()),
        };
        let file: InputsFile = toml::from_str(&raw).map_err(|e| {
            Error::Config(format!("invalid inputs file {}: {}", self.path.display(), e))
        })?;

        let inputs = ForecastInputs {
            forecast_duration_minutes: file
                .forecast_duration_minutes
                .unwrap_or(self.defaults.forecast_duration_minutes),
            target_temperature: file
                .target_temperature
                .unwrap_or(self.defaults.target_temperature),
        };
        if inputs.forecast_duration_minutes > MAX_FORECAST_MINUTES {
            return Err(Error::Config(format!(
                "{}: forecast_duration_minutes must be <= {}",
                self.path.display(),
                MAX_FORECAST_MINUTES
            )));
        }
        if !inputs.target_temperature.is_finite() {
            return Err(Error::Config(format!(
                "{}: target_temperature must be finite",
                self.path.display()
            )));
        }
        Ok(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: ForecastInputs = ForecastInputs {
        forecast_duration_minutes: 10,
        target_temperature: 165.0,
    };

    #[test]
    fn test_file_inputs_fallbacks_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inputs.toml");
        let inputs = FileInputs::new(&path, DEFAULTS);

        assert_eq!(inputs.read().unwrap(), DEFAULTS);

        std::fs::write(&path, "target_temperature = 155.5\n").unwrap();
        assert_eq!(
            inputs.read().unwrap(),
            ForecastInputs {
                forecast_duration_minutes: 10,
                target_temperature: 155.5,
            }
        );

        std::fs::write(&path, "forecast_duration_minutes = 30\ntarget_temperature = 140.0\n").unwrap();
        let read = inputs.read().unwrap();
        assert_eq!(read.forecast_duration_minutes, 30);
        assert_eq!(read.target_temperature, 140.0);
    }

    #[test]
    fn test_file_inputs_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inputs.toml");
        let inputs = FileInputs::new(&path, DEFAULTS);

        std::fs::write(&path, "forecast_duration_minutes = -5\n").unwrap();
        assert!(matches!(inputs.read(), Err(Error::Config(_))));

        std::fs::write(&path, "forecast_minutes = 5\n").unwrap();
        assert!(matches!(inputs.read(), Err(Error::Config(_))));

        std::fs::write(&path, "forecast_duration_minutes = 4294967295\n").unwrap();
        assert!(matches!(inputs.read(), Err(Error::Config(_))));

        std::fs::write(&path, "target_temperature = nan\n").unwrap();
        assert!(matches!(inputs.read(), Err(Error::Config(_))));

        std::fs::write(&path, "forecast_duration_minutes = 1440\n").unwrap();
        assert_eq!(inputs.read().unwrap().forecast_duration_minutes, 1440);
    }

    #[test]
    fn test_static_inputs() {
        assert_eq!(StaticInputs(DEFAULTS).read().unwrap(), DEFAULTS);
    }
}
