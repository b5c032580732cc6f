use issue_resolution_predictor::{
    api::{build_router, AppState},
    config::Config,
    data::IssueDataset,
    ml::LinearModel,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "issue_resolution_predictor=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        default_config()
    });

    tracing::info!(
        "Starting Issue Resolution Predictor v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Load the issue dataset
    let dataset = Arc::new(IssueDataset::load(&config.dataset.path)?);
    tracing::info!("✅ Issue dataset loaded ({} issues)", dataset.len());

    // Load the trained model artifact
    let model = Arc::new(LinearModel::load(&config.model.path)?);
    tracing::info!(
        "✅ Model artifact loaded ({} coefficients, vocabulary of {})",
        model.coefficients.len(),
        model.issue_type_vocabulary.len()
    );

    // Create application state and router
    let state = AppState::new(dataset, model);
    let app = build_router(state);

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("🚀 HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!(
        "   Issue prediction: http://{}/api/issue/{{key}}/resolve-prediction",
        http_addr
    );
    tracing::info!(
        "   Release forecast: http://{}/api/release/{{date}}/resolved-since-now",
        http_addr
    );
    tracing::info!("Press Ctrl+C to shutdown");

    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

fn default_config() -> Config {
    use issue_resolution_predictor::config::*;

    Config {
        server: ServerConfig {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
            request_timeout_secs: 30,
        },
        dataset: DatasetConfig {
            path: "./data/avro-issues.csv".into(),
        },
        model: ModelConfig {
            path: "./data/linear_regression_model.json".into(),
        },
        observability: ObservabilityConfig {
            log_level: "info".to_string(),
            json_logs: false,
        },
    }
}
