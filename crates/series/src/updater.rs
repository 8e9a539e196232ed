//! The fetch-merge-render cycle.

use crate::cache::Series;
use crate::forecast::{project, CompletionEstimate};
use crate::inputs::InputSource;
use crate::plot::PlotSpec;
use crate::render::{
    completion_label, current_label, placeholder_current_label, RenderTarget, COMPLETION_ELEMENT,
    CURRENT_TEMPERATURE_ELEMENT, PLOT_CONTAINER,
};
use crate::store::KeyValueStore;
use common::config::{DecodeMode, MonitorConfig};
use common::Result;
use probe_client::{decode_stream_with, ProbeSource, SINCE_BEGINNING};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Per-updater settings taken from [`MonitorConfig`].
#[derive(Debug, Clone)]
pub struct UpdaterSettings {
    pub decode_mode: DecodeMode,
    pub max_samples: Option<usize>,
    pub unit: String,
}

impl UpdaterSettings {
    pub fn from_config(cfg: &MonitorConfig) -> Self {
        Self {
            decode_mode: cfg.stream.decode_mode,
            max_samples: cfg.storage.max_samples,
            unit: cfg.render.unit.clone(),
        }
    }
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self::from_config(&MonitorConfig::default())
    }
}

/// What a call to [`SeriesUpdater::refresh`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The cycle merged, persisted and rendered.
    Rendered(CycleSummary),
    /// Another cycle was already in flight.
    Skipped,
    /// State was reset while this cycle was fetching; its data was dropped.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
    pub received: usize,
    pub appended: usize,
    pub evicted: usize,
    pub total: usize,
    pub forecast_points: usize,
    pub estimate: CompletionEstimate,
}

/// Owns the cached series and drives one refresh cycle at a time.
pub struct SeriesUpdater {
    probe: Arc<dyn ProbeSource>,
    store: Arc<dyn KeyValueStore>,
    render: Arc<dyn RenderTarget>,
    inputs: Arc<dyn InputSource>,
    settings: UpdaterSettings,
    series: Mutex<Series>,
    /// Held for the whole of a render so a reset's empty dashboard is never
    /// overwritten by an older cycle.
    render_lock: Mutex<()>,
    in_flight: AtomicBool,
    /// Bumped by every reset.
    epoch: AtomicU64,
}

/// Clears the in-flight flag on drop.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SeriesUpdater {
    /// Build the updater, loading any series already in `store`.
    ///
    /// Unreadable stored data is logged and replaced by an empty series on the
    /// next persist.
    pub fn new(
        probe: Arc<dyn ProbeSource>,
        store: Arc<dyn KeyValueStore>,
        render: Arc<dyn RenderTarget>,
        inputs: Arc<dyn InputSource>,
        settings: UpdaterSettings,
    ) -> Self {
        let series = match Series::load(store.as_ref()) {
            Ok(series) => {
                info!("Loaded {} cached samples", series.len());
                series
            }
            Err(e) => {
                warn!("Ignoring unreadable cached series: {}", e);
                Series::new()
            }
        };

        Self {
            probe,
            store,
            render,
            inputs,
            settings,
            series: Mutex::new(series),
            render_lock: Mutex::new(()),
            in_flight: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
        }
    }

    /// Copy of the current series.
    pub fn series(&self) -> Series {
        self.lock_series().clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// `since` marker for the next stream fetch.
    pub fn since(&self) -> String {
        self.lock_series()
            .last()
            .map(|s| s.key.clone())
            .unwrap_or_else(|| SINCE_BEGINNING.to_string())
    }

    /// Run one fetch-merge-persist-render cycle.
    ///
    /// Fetch or decode failures abort the cycle before any state changes.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            debug!("Refresh already in flight; skipping");
            return Ok(RefreshOutcome::Skipped);
        };
        let epoch = self.epoch.load(Ordering::Acquire);

        let inputs = self.inputs.read()?;
        let since = self.since();
        debug!("Refreshing since {:?}", since);

        let (snapshot, payload) = tokio::try_join!(
            self.probe.fetch_snapshot(),
            self.probe.fetch_stream(&since)
        )?;
        let incoming = decode_stream_with(&payload, self.settings.decode_mode)?;

        let (plot, stats, evicted, total, forecast_points) = {
            let mut series = self.lock_series();
            if self.epoch.load(Ordering::Acquire) != epoch {
                info!("State was reset during refresh; discarding fetched data");
                return Ok(RefreshOutcome::Discarded);
            }

            let stats = series.merge(incoming);
            let evicted = self
                .settings
                .max_samples
                .map_or(0, |max| series.retain_latest(max));
            if let Err(e) = series.persist(self.store.as_ref()) {
                warn!("Failed to persist series: {}", e);
            }

            let forecast = project(&series, snapshot.rate, inputs.forecast_duration_minutes);
            let plot = PlotSpec::new(&series, &forecast, &self.settings.unit);
            (plot, stats, evicted, series.len(), forecast.len())
        };

        let estimate = CompletionEstimate::from_reading(
            inputs.target_temperature,
            snapshot.temperature,
            snapshot.rate,
        );

        {
            let _rendering = lock(&self.render_lock);
            if self.epoch.load(Ordering::Acquire) != epoch {
                info!("State was reset before render; discarding cycle");
                return Ok(RefreshOutcome::Discarded);
            }
            self.render.draw(PLOT_CONTAINER, &plot)?;
            self.render.set_text(
                CURRENT_TEMPERATURE_ELEMENT,
                &current_label(&snapshot, &self.settings.unit),
            )?;
            self.render
                .set_text(COMPLETION_ELEMENT, &completion_label(&estimate))?;
        }

        info!(
            "Cycle: received={} appended={} evicted={} total={} current={:.2} rate={:.2}/min eta={}",
            stats.received,
            stats.appended,
            evicted,
            total,
            snapshot.temperature,
            snapshot.rate,
            estimate
        );
        if let Some(stdev) = snapshot.stdev {
            debug!("Probe reports stdev={:.3}", stdev);
        }

        Ok(RefreshOutcome::Rendered(CycleSummary {
            received: stats.received,
            appended: stats.appended,
            evicted,
            total,
            forecast_points,
            estimate,
        }))
    }

    /// Clear stored and in-memory series and render an empty chart.
    pub fn reset(&self) -> Result<()> {
        info!("Clearing cached series");
        let _rendering = lock(&self.render_lock);
        {
            let mut series = self.lock_series();
            self.epoch.fetch_add(1, Ordering::AcqRel);
            series.clear();
            self.store.clear()?;
        }

        let unit = &self.settings.unit;
        self.render
            .draw(PLOT_CONTAINER, &PlotSpec::new(&Series::new(), &[], unit))?;
        self.render
            .set_text(CURRENT_TEMPERATURE_ELEMENT, &placeholder_current_label(unit))?;
        self.render.set_text(
            COMPLETION_ELEMENT,
            &completion_label(&CompletionEstimate::NotApplicable),
        )?;
        Ok(())
    }

    fn lock_series(&self) -> MutexGuard<'_, Series> {
        lock(&self.series)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
