//! Thermowatch: temperature probe monitor.
//!
//! Single-binary Tokio application that:
//! 1. Polls the probe for its current reading and new stream samples
//! 2. Merges them into a persisted, deduplicated series
//! 3. Projects the series forward and estimates time to target
//! 4. Renders the chart and labels into the output directory

mod config;

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use tracing::{debug, error, info, warn};

use common::config::MonitorConfig;
use probe_client::ProbeClient;
use series::{
    FileInputs, FileRenderTarget, FileStore, InputSource, RefreshOutcome, SeriesUpdater,
    StaticInputs, UpdaterSettings,
};

/// Temperature probe monitor with a linear completion forecast
#[derive(Parser)]
#[command(name = "thermowatch", about = "Temperature probe monitor")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Run a single refresh cycle and exit.
    #[arg(long)]
    once: bool,

    /// Clear the cached series, render the empty dashboard, and exit.
    #[arg(long)]
    reset: bool,

    /// Override the configured forecast horizon in minutes. A value in
    /// `forecast.inputs_file` still takes precedence.
    #[arg(long)]
    forecast_minutes: Option<u32>,

    /// Override the configured target temperature. A value in
    /// `forecast.inputs_file` still takes precedence.
    #[arg(long)]
    target: Option<f64>,
}

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Apply the forecast flags to `cfg`. Returns true when an inputs file is
/// configured and may shadow them.
fn apply_cli_overrides(cfg: &mut MonitorConfig, cli: &Cli) -> bool {
    if let Some(minutes) = cli.forecast_minutes {
        cfg.forecast.duration_minutes = minutes;
    }
    if let Some(target) = cli.target {
        cfg.forecast.target_temperature = target;
    }
    cfg.forecast.inputs_file.is_some() && (cli.forecast_minutes.is_some() || cli.target.is_some())
}

fn build_updater(cfg: &MonitorConfig) -> common::Result<SeriesUpdater> {
    let probe = ProbeClient::new(&cfg.probe)?;
    let store = FileStore::open(&cfg.storage.path)?;
    let render = FileRenderTarget::new(&cfg.render.output_dir)?;

    let defaults = cfg.forecast.inputs();
    let inputs: Arc<dyn InputSource> = match &cfg.forecast.inputs_file {
        Some(path) => {
            info!("Forecast inputs file: {}", path.display());
            Arc::new(FileInputs::new(path, defaults))
        }
        None => Arc::new(StaticInputs(defaults)),
    };

    Ok(SeriesUpdater::new(
        Arc::new(probe),
        Arc::new(store),
        Arc::new(render),
        inputs,
        UpdaterSettings::from_config(cfg),
    ))
}

fn log_outcome(outcome: &RefreshOutcome) {
    match outcome {
        RefreshOutcome::Rendered(summary) => debug!(
            "Cycle: received={} appended={} evicted={} total={} estimate={}",
            summary.received,
            summary.appended,
            summary.evicted,
            summary.total,
            summary.estimate
        ),
        RefreshOutcome::Skipped => debug!("Previous refresh still running; tick skipped"),
        RefreshOutcome::Discarded => info!("Refresh discarded after reset"),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "thermowatch=info,probe_client=info,series=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("Thermowatch starting up...");

    // Load configuration.
    let mut cfg = match config::load_config(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if apply_cli_overrides(&mut cfg, &cli) {
        if let Some(path) = &cfg.forecast.inputs_file {
            warn!(
                "--forecast-minutes/--target are defaults only; values in {} override them",
                path.display()
            );
        }
    }
    if let Err(e) = config::validate_config(&cfg) {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("Probe: {}", cfg.probe.base_url);
    info!(
        "Forecast: {} min, target {:.2} {}",
        cfg.forecast.duration_minutes, cfg.forecast.target_temperature, cfg.render.unit
    );
    info!(
        "Storage: {} (max_samples={:?}), output: {}",
        cfg.storage.path.display(),
        cfg.storage.max_samples,
        cfg.render.output_dir.display()
    );

    let updater = match build_updater(&cfg) {
        Ok(u) => Arc::new(u),
        Err(e) => {
            error!("Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    if cli.reset {
        if let Err(e) = updater.reset() {
            error!("Reset failed: {}", e);
            std::process::exit(1);
        }
        info!("Series cleared.");
        return;
    }

    if cli.once {
        match updater.refresh().await {
            Ok(outcome) => {
                log_outcome(&outcome);
                info!("Series holds {} samples.", updater.series().len());
            }
            Err(e) => {
                error!("Error fetching data: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // ── Refresh loop ─────────────────────────────────────────────────
    let refresh_updater = updater.clone();
    let refresh_every = Duration::from_secs(cfg.timing.refresh_interval_secs);
    let refresh_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(refresh_every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let cycle_updater = refresh_updater.clone();
            tokio::spawn(async move {
                match cycle_updater.refresh().await {
                    Ok(outcome) => log_outcome(&outcome),
                    Err(e) => error!("Error fetching data: {}", e),
                }
            });
        }
    });

    // ── Heartbeat ────────────────────────────────────────────────────
    let hb_updater = updater.clone();
    let heartbeat_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            info!(
                "HEARTBEAT: samples={} since={} refreshing={}",
                hb_updater.series().len(),
                hb_updater.since(),
                hb_updater.is_refreshing()
            );
        }
    });

    // ── Wait for shutdown ────────────────────────────────────────────
    info!("Thermowatch is running. Press Ctrl+C to stop.");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        r = refresh_handle => {
            error!("Refresh task exited: {:?}", r);
        }
        r = heartbeat_handle => {
            warn!("Heartbeat task exited: {:?}", r);
        }
    }

    info!("Thermowatch shut down.");
}
