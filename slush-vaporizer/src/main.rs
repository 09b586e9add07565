//! slush-vaporizer - audio vaporization service
//!
//! Accepts uploads over HTTP, runs them through the effect pipeline as
//! background jobs, serves the results, and sweeps old outputs.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use slush_common::events::EventBus;
use slush_vaporizer::analysis::FeatureAnalyzer;
use slush_vaporizer::config::{Cli, ServiceSettings};
use slush_vaporizer::effects::{EffectExecutor, SoxExecutor};
use slush_vaporizer::jobs::JobOrchestrator;
use slush_vaporizer::options::PresetCatalog;
use slush_vaporizer::pipeline::{PipelineRunner, Vaporizer};
use slush_vaporizer::retention::RetentionSweeper;
use slush_vaporizer::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let toml_config = slush_common::config::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let settings = ServiceSettings::resolve(&cli, &toml_config);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(format!("{},tower_http=info", settings.log_level))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting slush-vaporizer");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Root folder: {}", settings.root_folder.display());

    for dir in [&settings.uploads_dir, &settings.outputs_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    info!(
        uploads = %settings.uploads_dir.display(),
        outputs = %settings.outputs_dir.display(),
        "Storage ready"
    );

    let presets = match &settings.presets_path {
        Some(path) => PresetCatalog::load(path),
        None => PresetCatalog::builtin(),
    }
    .context("Failed to load preset catalog")?;
    info!(count = presets.len(), "Presets available");

    let sox = SoxExecutor::new(settings.sox_binary.clone());
    if let Err(e) = sox.probe() {
        warn!(error = %e, "SoX not available; transform jobs will fail until it is installed");
    }
    let executor: Arc<dyn EffectExecutor> = Arc::new(sox);

    let event_bus = EventBus::new(100);
    let vaporizer = Vaporizer::new(
        PipelineRunner::new(Arc::clone(&executor)),
        FeatureAnalyzer::native(),
        Arc::new(presets),
    );
    let orchestrator = JobOrchestrator::new(
        vaporizer,
        executor,
        settings.outputs_dir.clone(),
        settings.worker_slots,
        event_bus.clone(),
    );
    info!(worker_slots = settings.worker_slots, "Job orchestrator ready");

    let sweeper = RetentionSweeper::new(settings.outputs_dir.clone(), settings.retention)
        .with_jobs(orchestrator.clone());
    sweeper.spawn(settings.sweep_interval, event_bus.clone());
    info!(
        retention_secs = settings.retention.as_secs(),
        interval_secs = settings.sweep_interval.as_secs(),
        "Retention sweeper scheduled"
    );

    let state = AppState::new(orchestrator, event_bus, settings.uploads_dir.clone());
    let app = slush_vaporizer::build_router(state);

    let addr = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
