use std::sync::Arc;

use haggle::MarketplaceBuilder;
use haggle_api::{
    build_router,
    config::{Config, StorageBackend},
    state::AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Haggle API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let market = marketplace_builder(&config)?.build().await?;
    if !market.advisor().is_enabled() {
        tracing::warn!("ADVISOR_API_KEY not set, pricing advisor runs on fallback estimates only");
    }

    let sweeper = market.spawn_sweeper();
    tracing::info!(
        interval_secs = market.ledger().config().sweep_interval.as_secs(),
        "Offer expiry sweep started"
    );

    let state = Arc::new(AppState::new(config.clone(), market));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.stop().await;
    tracing::info!("Server stopped");
    Ok(())
}

fn marketplace_builder(config: &Config) -> anyhow::Result<MarketplaceBuilder> {
    let mut builder = MarketplaceBuilder::new()
        .advisor_key(config.advisor_api_key.clone())
        .advisor_config((&config.advisor).into())
        .ledger_config((&config.offers).into())
        .event_capacity(config.events.capacity);

    if let Some(url) = &config.advisor.base_url {
        builder = builder.advisor_base_url(url.clone());
    }

    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory store");
        }
        #[cfg(feature = "mongodb")]
        StorageBackend::Mongodb => {
            tracing::info!(database = %config.storage.database, "Connecting to MongoDB");
            let uri = config
                .mongodb_uri
                .clone()
                .ok_or_else(|| anyhow::anyhow!("MONGODB_URI is not set"))?;
            builder = builder.mongodb(uri, config.storage.database.clone());
        }
        #[cfg(not(feature = "mongodb"))]
        StorageBackend::Mongodb => {
            anyhow::bail!(
                "storage.backend = \"mongodb\" requires building with the `mongodb` feature"
            );
        }
    }

    Ok(builder)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
