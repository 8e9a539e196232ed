//! Series engine crate.
//!
//! Merges the probe stream into the cached series, projects the forecast and
//! hands the chart to a render target.

pub mod cache;
pub mod forecast;
pub mod inputs;
pub mod plot;
pub mod render;
pub mod store;
pub mod updater;

pub use cache::{MergeStats, Series, TEMPERATURES_KEY, TIMESTAMPS_KEY};
pub use forecast::{project, CompletionEstimate};
pub use inputs::{FileInputs, InputSource, StaticInputs};
pub use plot::PlotSpec;
pub use render::{FileRenderTarget, RenderTarget};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use updater::{CycleSummary, RefreshOutcome, SeriesUpdater, UpdaterSettings};
