use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod aws_clients;
mod config;
mod db;
mod domain;
mod errors;
mod handlers;
mod models;
mod repositories;
mod routes;
mod service;
mod startup;
mod storage;
mod tagging;
mod upload;

use crate::config::Config;
use crate::errors::AppError;
use crate::repositories::SqlMemeRepository;
use crate::service::MemeService;
use crate::storage::S3FileStorage;
use crate::tagging::ImaggaTagger;
use crate::upload::MemeUploader;

/// AppState holds shared resources for the web server.
#[derive(Clone)]
pub struct AppState {
    pub memes: MemeService,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "meme_db=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = Config::load()?;
    if config.imagga_api_key.is_empty() || config.imagga_api_secret.is_empty() {
        tracing::warn!("IMAGGA_API_KEY or IMAGGA_API_SECRET is not set; automatic tagging will return nothing");
    }

    // --- Client Initialization ---
    tracing::info!("Initializing AWS S3 client...");
    let sdk_config = aws_clients::create_sdk_config(&config).await;
    let s3_client = aws_clients::create_s3_client(&sdk_config, config.storage_endpoint.is_some());

    tracing::info!("Connecting to the database...");
    let pool = db::connect(&config.database_url).await.map_err(|e| {
        tracing::error!("Failed to connect to the database: {:#}", e);
        AppError::InitError(format!("Failed to connect to the database: {:#}", e))
    })?;

    startup::init_resources(&pool, &s3_client, &config).await?;

    let tagger = ImaggaTagger::new(
        config.imagga_endpoint.clone(),
        config.imagga_api_key.clone(),
        config.imagga_api_secret.clone(),
        config.external_timeout,
    )
    .map_err(|e| AppError::InitError(format!("Failed to build tagging HTTP client: {}", e)))?;

    let uploader = MemeUploader::new(
        Arc::new(S3FileStorage::new(s3_client)),
        config.bucket_name.clone(),
        config.aws_region.clone(),
    );

    // --- Application State ---
    let state = Arc::new(AppState {
        memes: MemeService::new(Arc::new(SqlMemeRepository::new(pool)), uploader, Arc::new(tagger)),
    });

    let app = routes::create_router(state);

    // --- Server Startup ---
    tracing::info!("Server listening on http://{}", config.bind_address);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?; // Use ? with From<std::io::Error>
    axum::serve(listener, app).await?;

    Ok(())
}
