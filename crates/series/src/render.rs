//! Render targets: where the chart and the two text labels go.

use crate::forecast::CompletionEstimate;
use crate::plot::PlotSpec;
use crate::store::write_atomic;
use common::{Error, Result, Snapshot};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Container the chart is drawn into.
pub const PLOT_CONTAINER: &str = "time-series-plot";
/// Element showing the current temperature and rate.
pub const CURRENT_TEMPERATURE_ELEMENT: &str = "currentTemperature";
/// Element showing the completion estimate.
pub const COMPLETION_ELEMENT: &str = "completionCalculation";

pub trait RenderTarget: Send + Sync {
    /// Replace the chart in `container`.
    fn draw(&self, container: &str, plot: &PlotSpec) -> Result<()>;
    /// Replace the text of `element`.
    fn set_text(&self, element: &str, text: &str) -> Result<()>;
}

/// `71.00 °F ± 1.00 °F/min`
pub fn current_label(snapshot: &Snapshot, unit: &str) -> String {
    format!(
        "{:.2} {unit} ± {:.2} {unit}/min",
        snapshot.temperature, snapshot.rate
    )
}

/// Shown after a reset, before the next reading arrives.
pub fn placeholder_current_label(unit: &str) -> String {
    format!("-- {unit} ± -- {unit}/min")
}

/// `Estimated Time: 01:30:00`
pub fn completion_label(estimate: &CompletionEstimate) -> String {
    format!("Estimated Time: {estimate}")
}

/// Writes `<dir>/<container>.json` and `<dir>/<element>.txt`.
#[derive(Debug, Clone)]
pub struct FileRenderTarget {
    dir: PathBuf,
}

impl FileRenderTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            Error::Render(format!("cannot create output dir {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write(&self, file_name: String, contents: &[u8]) -> Result<()> {
        let path = self.dir.join(file_name);
        write_atomic(&path, contents)
            .map_err(|e| Error::Render(format!("writing {}: {}", path.display(), e)))
    }
}

impl RenderTarget for FileRenderTarget {
    fn draw(&self, container: &str, plot: &PlotSpec) -> Result<()> {
        let raw = serde_json::to_vec_pretty(plot)?;
        self.write(format!("{container}.json"), &raw)
    }

    fn set_text(&self, element: &str, text: &str) -> Result<()> {
        info!("{}: {}", element, text);
        self.write(format!("{element}.txt"), text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Series;

    #[test]
    fn test_labels() {
        let snapshot = Snapshot::new(71.0, 1.0);
        assert_eq!(current_label(&snapshot, "°F"), "71.00 °F ± 1.00 °F/min");
        assert_eq!(placeholder_current_label("°C"), "-- °C ± -- °C/min");
        assert_eq!(
            completion_label(&CompletionEstimate::from_minutes(90.0)),
            "Estimated Time: 01:30:00"
        );
        assert_eq!(
            completion_label(&CompletionEstimate::NotApplicable),
            "Estimated Time: N/A"
        );
    }

    #[test]
    fn test_file_render_target_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = FileRenderTarget::new(dir.path().join("out")).unwrap();

        target
            .draw(PLOT_CONTAINER, &PlotSpec::new(&Series::new(), &[], "°F"))
            .unwrap();
        target
            .set_text(COMPLETION_ELEMENT, "Estimated Time: N/A")
            .unwrap();

        let plot: serde_json::Value = serde_json::from_slice(
            &fs::read(target.dir().join("time-series-plot.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(plot["data"].as_array().map(Vec::len), Some(2));
        assert_eq!(
            fs::read_to_string(target.dir().join("completionCalculation.txt")).unwrap(),
            "Estimated Time: N/A"
        );
    }
}
