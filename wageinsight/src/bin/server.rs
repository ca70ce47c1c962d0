//! WageInsight Server binary

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wageinsight::PredictionBackend;
use wageinsight::api::{ApiState, create_router};
use wageinsight::{
    HttpPredictionClient, OptionCatalog, OptionLoader, PredictionOrchestrator, WageInsightConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting WageInsight Server v{}", env!("CARGO_PKG_VERSION"));

    // Load config from file, falling back to defaults when none is given
    let config = match std::env::args().nth(1) {
        Some(config_path) => {
            let config_contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {}", config_path))?;
            let config: WageInsightConfig = toml::from_str(&config_contents)
                .with_context(|| format!("Failed to parse config file: {}", config_path))?;
            info!(config_path, "Loaded configuration");
            config
        }
        None => {
            info!("No config file given, using defaults");
            WageInsightConfig::default()
        }
    };

    let client = HttpPredictionClient::new(&config.prediction_url, config.timeout())?
        .with_upload_url(&config.upload_url);
    let health = client.health_check().await;
    if health.healthy {
        info!(
            upstream = %config.prediction_url,
            latency_ms = ?health.latency_ms,
            "Prediction service reachable"
        );
    } else {
        warn!(
            upstream = %config.prediction_url,
            error = ?health.error,
            "Prediction service health check failed"
        );
    }

    // Missing option files degrade to empty lists rather than failing startup
    let loader = OptionLoader::new(config.timeout())?;
    let catalog = OptionCatalog::load_lenient(&loader, &config.options_prefix).await;

    let orchestrator = PredictionOrchestrator::new(Arc::new(client), config.orchestrator());
    let state = Arc::new(ApiState {
        orchestrator: Arc::new(orchestrator),
        catalog: Arc::new(catalog),
    });

    let app = create_router(state);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.listen_addr))?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
