use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tradeledger::{api, Config, DataSource, FtxAuth, FtxDataSource, PrecisionTable, Reconciler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let port = config.port;

    let precision = match &config.precision_file {
        Some(path) => PrecisionTable::from_json_file(path)
            .with_context(|| format!("Failed to load precision table from {}", path))?,
        None => PrecisionTable::mainnet(),
    };
    tracing::info!("Loaded precision for {} markets", precision.len());
    let precision = Arc::new(precision);

    let auth = FtxAuth::new(
        config.ftx_api_key.clone(),
        config.ftx_api_secret.clone(),
        config.ftx_subaccount.clone(),
    );
    let datasource: Arc<dyn DataSource> = Arc::new(
        FtxDataSource::new(config.ftx_api_url.clone(), auth)
            .with_page_limit(config.fills_page_limit)
            .with_rate_limit(config.rate_limit()),
    );
    let reconciler = Arc::new(Reconciler::new(datasource, precision.clone()));

    let app = api::create_router(api::AppState::new(reconciler, precision));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
