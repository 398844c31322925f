//! strata-exporter
//!
//! - Reads `system_metrics` aggregates every `COLLECTION_INTERVAL` seconds
//! - Serves the registry at `/metrics` on `METRICS_PORT`
//! - Runs until the process is terminated

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strata_exporter::{
    app_state::AppState,
    collector::{Collector, CollectorOptions},
    config,
    obs::ExporterMetrics,
    router,
    source::PgSource,
    EXPORTER_INFO,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = match config::load_from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(code = e.kind().as_str(), error = %e, "config load failed");
            return;
        }
    };
    let listen = match cfg.exporter.listen_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, "invalid listen address");
            return;
        }
    };
    tracing::debug!(database = ?cfg.database, "datastore config");

    let metrics = Arc::new(ExporterMetrics::new());
    metrics.set_info(EXPORTER_INFO);

    let source = Arc::new(PgSource::new(&cfg.database));
    let options = CollectorOptions {
        cost_aggregate: cfg.exporter.collect_cost_aggregate,
    };
    let collector = Arc::new(Collector::new(source, Arc::clone(&metrics), options));

    let state = AppState::new(metrics, Arc::clone(&collector));
    let app = router::build_router(state);

    let listener = match tokio::net::TcpListener::bind(listen).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%listen, error = %e, "failed to bind");
            return;
        }
    };
    tracing::info!(%listen, "metrics exporter started, metrics at /metrics");
    tracing::info!(
        interval_secs = cfg.exporter.collection_interval_secs,
        cost_aggregate = options.cost_aggregate,
        "collection interval"
    );

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics server stopped");
        }
    });

    tokio::select! {
        _ = collector.run_forever(cfg.exporter.collection_interval()) => {},
        _ = shutdown_signal() => {},
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, exiting");
}
