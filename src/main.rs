use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use asclepius::config::Config;
use asclepius::inference::{ModelSlot, OnnxModel};
use asclepius::store::{DocumentStore, MemoryDocumentStore, PgDocumentStore};
use asclepius::{create_router, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    init_logging(&config);

    tracing::info!("Asclepius server starting...");

    let store = connect_store(&config).await?;

    // Serve immediately; /predict answers 503 until the model is in place
    let model = ModelSlot::with_workers(config.inference_workers);
    spawn_model_loader(model.clone(), config.model_url.clone());

    let state = AppState::new(model, store, config.clone());
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "asclepius=debug,tower_http=debug".into());

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set; prediction history is kept in memory only");
        return Ok(Arc::new(MemoryDocumentStore::new()));
    };

    tracing::info!("Database: {}", database_url.split('@').last().unwrap_or("***"));

    let pool = db::create_pool(database_url, config.store_timeout)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Running database migrations...");
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    Ok(Arc::new(PgDocumentStore::new(pool)))
}

fn spawn_model_loader(slot: ModelSlot, model_url: String) {
    tokio::spawn(async move {
        match OnnxModel::load(&model_url).await {
            Ok(model) => {
                slot.install(Arc::new(model));
            }
            Err(e) => {
                tracing::error!("Error loading the model from {}: {}", model_url, e);
            }
        }
    });
}
