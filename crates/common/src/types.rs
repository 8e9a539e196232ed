//! Domain types shared across the monitor.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, SecondsFormat};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ── Series types ──────────────────────────────────────────────────────

/// One persisted reading. `key` is the upstream timestamp string verbatim and
/// is the dedup identity of the sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub key: String,
    pub temperature: f64,
}

impl Sample {
    pub fn new(key: impl Into<String>, temperature: f64) -> Self {
        Self {
            key: key.into(),
            temperature,
        }
    }
}

/// Current reading from GET /data/current.
///
/// Other fields the probe publishes (`heartbeat`, its epoch `timestamp`) are
/// ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Snapshot {
    #[serde(deserialize_with = "de_lenient_f64")]
    pub temperature: f64,
    /// Degrees per minute.
    #[serde(deserialize_with = "de_lenient_f64")]
    pub rate: f64,
    #[serde(default, deserialize_with = "de_lenient_opt_f64")]
    pub stdev: Option<f64>,
}

impl Snapshot {
    pub fn new(temperature: f64, rate: f64) -> Self {
        Self {
            temperature,
            rate,
            stdev: None,
        }
    }
}

/// A projected sample on the forecast line.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPoint {
    pub timestamp: SampleTime,
    pub temperature: f64,
}

/// User-controlled forecast parameters, read at the start of every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastInputs {
    pub forecast_duration_minutes: u32,
    pub target_temperature: f64,
}

// ── Lenient numbers ───────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("expected a number, got {s:?}"))),
        }
    }
}

/// Accepts `71.5` as well as `"71.5"`.
fn de_lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    NumberOrString::deserialize(deserializer)?.into_f64()
}

fn de_lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(value) => value.into_f64().map(Some),
        None => Ok(None),
    }
}

// ── Sample timestamps ─────────────────────────────────────────────────

const SPACED: &str = "%Y-%m-%d %H:%M:%S";
const SPACED_WITH_OFFSET: &str = "%Y-%m-%d %H:%M:%S %:z";
const ISO_NAIVE: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyStyle {
    Rfc3339,
    SpacedWithOffset,
    Spaced,
    IsoNaive,
}

/// Parsed view of a sample key, used only for forecast arithmetic.
///
/// Formatting writes the time back in the same style the key used, so the
/// first forecast point lines up with the last real sample on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleTime {
    local: NaiveDateTime,
    offset: Option<FixedOffset>,
    style: KeyStyle,
}

impl SampleTime {
    /// Parse a sample key. Returns `None` for unrecognised formats.
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(key) {
            return Some(Self::with_offset(dt, KeyStyle::Rfc3339));
        }
        if let Ok(dt) = DateTime::parse_from_str(key, SPACED_WITH_OFFSET) {
            return Some(Self::with_offset(dt, KeyStyle::SpacedWithOffset));
        }
        if let Ok(local) = NaiveDateTime::parse_from_str(key, SPACED) {
            return Some(Self {
                local,
                offset: None,
                style: KeyStyle::Spaced,
            });
        }
        NaiveDateTime::parse_from_str(key, ISO_NAIVE)
            .ok()
            .map(|local| Self {
                local,
                offset: None,
                style: KeyStyle::IsoNaive,
            })
    }

    fn with_offset(dt: DateTime<FixedOffset>, style: KeyStyle) -> Self {
        Self {
            local: dt.naive_local(),
            offset: Some(*dt.offset()),
            style,
        }
    }

    pub fn plus_minutes(&self, minutes: u32) -> Self {
        Self {
            local: self.local + Duration::minutes(i64::from(minutes)),
            ..*self
        }
    }

    /// Wall-clock time as written in the key, offset dropped, in the
    /// `YYYY-MM-DD HH:MM:SS` form a chart date axis understands.
    pub fn chart_time(&self) -> String {
        self.local.format(SPACED).to_string()
    }
}

impl fmt::Display for SampleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.style, self.offset) {
            (KeyStyle::Rfc3339, Some(offset)) => {
                let dt = self
                    .local
                    .and_local_timezone(offset)
                    .single()
                    .ok_or(fmt::Error)?;
                write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            (KeyStyle::SpacedWithOffset, Some(offset)) => {
                let dt = self
                    .local
                    .and_local_timezone(offset)
                    .single()
                    .ok_or(fmt::Error)?;
                write!(f, "{}", dt.format(SPACED_WITH_OFFSET))
            }
            (KeyStyle::IsoNaive, _) => write!(f, "{}", self.local.format(ISO_NAIVE)),
            _ => write!(f, "{}", self.local.format(SPACED)),
        }
    }
}
