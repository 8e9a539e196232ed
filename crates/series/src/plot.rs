//! Plotly-compatible chart specification.

use crate::cache::Series;
use common::{ForecastPoint, SampleTime};
use serde::Serialize;

const ACTUAL_COLOR: &str = "rgb(0, 100, 255)";
const FORECAST_COLOR: &str = "rgb(255, 0, 0)";
const TEXT_COLOR: &str = "white";
const GRID_COLOR: &str = "gray";

/// `data` + `layout`, ready for `Plotly.newPlot(container, data, layout)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSpec {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub x: Vec<String>,
    pub y: Vec<f64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    pub line: Line,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub xaxis: Axis,
    pub yaxis: Axis,
    pub legend: Legend,
    pub paper_bgcolor: String,
    pub plot_bgcolor: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: AxisTitle,
    pub tickfont: Font,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickformat: Option<String>,
    pub showgrid: bool,
    pub gridcolor: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTitle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub font: Font,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub font: Font,
    pub x: f64,
    pub y: f64,
}

impl PlotSpec {
    /// Actual series as a filled area, forecast as a dotted line.
    pub fn new(series: &Series, forecast: &[ForecastPoint], unit: &str) -> Self {
        let actual = Trace {
            x: series.samples().iter().map(|s| chart_x(&s.key)).collect(),
            y: series.samples().iter().map(|s| s.temperature).collect(),
            kind: "scatter".into(),
            mode: "lines".into(),
            fill: Some("tozeroy".into()),
            line: Line {
                color: ACTUAL_COLOR.into(),
                dash: None,
            },
            name: "Actual Temperature".into(),
        };

        let projected = Trace {
            x: forecast.iter().map(|p| p.timestamp.chart_time()).collect(),
            y: forecast.iter().map(|p| p.temperature).collect(),
            kind: "scatter".into(),
            mode: "lines".into(),
            fill: None,
            line: Line {
                color: FORECAST_COLOR.into(),
                dash: Some("dot".into()),
            },
            name: "Forecasted Temperature".into(),
        };

        Self {
            data: vec![actual, projected],
            layout: Layout::dashboard(unit),
        }
    }

    pub fn actual(&self) -> &Trace {
        &self.data[0]
    }

    pub fn forecast(&self) -> &Trace {
        &self.data[1]
    }
}

impl Layout {
    fn dashboard(unit: &str) -> Self {
        Self {
            xaxis: Axis {
                title: AxisTitle {
                    text: None,
                    font: white(),
                },
                tickfont: white(),
                tickformat: Some("%I:%M %p".into()),
                showgrid: true,
                gridcolor: GRID_COLOR.into(),
            },
            yaxis: Axis {
                title: AxisTitle {
                    text: Some(format!("Temperature ({})", unit.trim_start_matches('°'))),
                    font: white(),
                },
                tickfont: white(),
                tickformat: None,
                showgrid: true,
                gridcolor: GRID_COLOR.into(),
            },
            legend: Legend {
                font: white(),
                x: 0.0,
                y: 1.2,
            },
            paper_bgcolor: "rgba(0,0,0,0.1)".into(),
            plot_bgcolor: "rgba(0,0,0,0)".into(),
        }
    }
}

/// Date-axis value for a sample key. Unrecognised keys are passed through.
fn chart_x(key: &str) -> String {
    SampleTime::parse(key)
        .map(|t| t.chart_time())
        .unwrap_or_else(|| key.to_string())
}

fn white() -> Font {
    Font {
        color: TEXT_COLOR.into(),
    }
}
