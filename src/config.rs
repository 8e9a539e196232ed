//! Configuration loader: merges env vars, .env file, and config.toml.

use common::config::{DecodeMode, MonitorConfig, MAX_FORECAST_MINUTES};
use common::Error;
use std::path::{Path, PathBuf};

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    match raw.trim().parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(Error::Config(format!("{env_name} must be an integer > 0"))),
    }
}

fn parse_non_negative_u32(raw: &str, env_name: &str) -> Result<u32, Error> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn parse_finite_f64(raw: &str, env_name: &str) -> Result<f64, Error> {
    match raw.trim().parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(Error::Config(format!("{env_name} must be a number"))),
    }
}

fn parse_decode_mode(raw: &str) -> Result<DecodeMode, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "strict" => Ok(DecodeMode::Strict),
        "lenient" => Ok(DecodeMode::Lenient),
        _ => Err(Error::Config(
            "THERMOWATCH_DECODE_MODE must be one of: strict, lenient".into(),
        )),
    }
}

/// Apply `THERMOWATCH_*` overrides. `lookup` returns the raw value of a variable.
fn apply_env_overrides(
    config: &mut MonitorConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), Error> {
    if let Some(url) = lookup("THERMOWATCH_BASE_URL") {
        config.probe.base_url = url.trim().to_string();
    }
    if let Some(raw) = lookup("THERMOWATCH_REFRESH_SECS") {
        config.timing.refresh_interval_secs = parse_positive_u64(&raw, "THERMOWATCH_REFRESH_SECS")?;
    }
    if let Some(raw) = lookup("THERMOWATCH_FORECAST_MINUTES") {
        config.forecast.duration_minutes =
            parse_non_negative_u32(&raw, "THERMOWATCH_FORECAST_MINUTES")?;
    }
    if let Some(raw) = lookup("THERMOWATCH_TARGET_TEMP") {
        config.forecast.target_temperature = parse_finite_f64(&raw, "THERMOWATCH_TARGET_TEMP")?;
    }
    if let Some(raw) = lookup("THERMOWATCH_STORE_PATH") {
        config.storage.path = PathBuf::from(raw.trim());
    }
    if let Some(raw) = lookup("THERMOWATCH_OUTPUT_DIR") {
        config.render.output_dir = PathBuf::from(raw.trim());
    }
    if let Some(raw) = lookup("THERMOWATCH_DECODE_MODE") {
        config.stream.decode_mode = parse_decode_mode(&raw)?;
    }
    if let Some(raw) = lookup("THERMOWATCH_MAX_SAMPLES") {
        let parsed = parse_positive_u64(&raw, "THERMOWATCH_MAX_SAMPLES")?;
        config.storage.max_samples = Some(usize::try_from(parsed).unwrap_or(usize::MAX));
    }
    Ok(())
}

pub fn validate_config(config: &MonitorConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.probe.base_url.trim().is_empty() {
        issues.push("probe.base_url must be set".into());
    } else if !config.probe.base_url.starts_with("http://")
        && !config.probe.base_url.starts_with("https://")
    {
        issues.push("probe.base_url must start with http:// or https://".into());
    }
    if config.probe.snapshot_path.trim().is_empty() {
        issues.push("probe.snapshot_path must be set".into());
    }
    if config.probe.stream_path.trim().is_empty() {
        issues.push("probe.stream_path must be set".into());
    }
    if config.probe.request_timeout_secs == 0 {
        issues.push("probe.request_timeout_secs must be > 0".into());
    }

    if config.timing.refresh_interval_secs == 0 {
        issues.push("timing.refresh_interval_secs must be > 0".into());
    }

    if config.forecast.duration_minutes > MAX_FORECAST_MINUTES {
        issues.push(format!(
            "forecast.duration_minutes must be <= {MAX_FORECAST_MINUTES}"
        ));
    }
    if !config.forecast.target_temperature.is_finite() {
        issues.push("forecast.target_temperature must be a finite number".into());
    }

    if config.storage.path.as_os_str().is_empty() {
        issues.push("storage.path must be set".into());
    }
    if config.storage.max_samples == Some(0) {
        issues.push("storage.max_samples must be > 0 when set".into());
    }

    if config.render.output_dir.as_os_str().is_empty() {
        issues.push("render.output_dir must be set".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load monitor configuration from defaults, `config_path` and the environment.
pub fn load_config(config_path: &Path) -> Result<MonitorConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = MonitorConfig::default();

    // 3. Try loading the config file if it exists.
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", config_path.display(), e))
        })?;
        config = toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", config_path.display(), e))
        })?;
    } else {
        tracing::debug!("{} not found; using defaults", config_path.display());
    }

    // 4. Override with environment variables (highest priority).
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    validate_config(&config)?;

    Ok(config)
}
