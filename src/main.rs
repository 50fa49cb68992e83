use std::env;
use std::sync::Arc;

use dotenv::dotenv;
use env_logger::Env;
use log::{error, info, warn};
use rocket::figment::{
    providers::{Env as EnvProvider, Format, Toml},
    Figment, Profile,
};
use rocket::Config;
use thiserror::Error;

use previewer::cache::{ImageCache, ThumbnailCache};
use previewer::config::AppConfig;
use previewer::images::{FetchError, HttpFetcher, PreviewService};
use previewer::storage::{FileStore, StoreError};
use previewer::validation::ValidationError;

#[derive(Error, Debug)]
enum StartupError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] rocket::figment::Error),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to open thumbnail storage: {0}")]
    Storage(#[from] StoreError),

    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] FetchError),

    #[error("Server error: {0}")]
    Server(#[from] rocket::Error),
}

#[rocket::main]
async fn main() -> Result<(), StartupError> {
    dotenv().ok();

    // Load config
    let mut figment = Figment::from(Config::default())
        .merge(Toml::file("App.toml").nested())
        .merge(EnvProvider::prefixed("PREVIEWER_").global());

    // Merge forwarded header list
    if let Ok(names) = env::var("FORWARD_HEADERS") {
        figment = figment.merge((
            "forward_headers",
            names
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<String>>(),
        ));
    }

    figment = figment.select(Profile::from_env_or("APP_PROFILE", "default"));

    // App config
    let config = figment.extract::<AppConfig>()?;

    // Initialize logger
    env_logger::init_from_env(Env::default().default_filter_or(config.effective_log_filter()));
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }
    info!("Configuration loaded successfully");

    let store = Arc::new(FileStore::open(&config.storage_path).await?);
    info!("Thumbnail storage at {}", store.root().display());

    // Warm the cache before serving; a broken entry stops warming but not startup
    let cache = Arc::new(ImageCache::new(config.cache_capacity));
    if let Err(e) = cache.warm(store.as_ref()).await {
        warn!("Cache warming stopped early: {}", e);
    }
    info!(
        "Thumbnail cache holds {}/{} entries",
        cache.len(),
        cache.capacity()
    );

    let fetcher = Arc::new(HttpFetcher::new(config.timeout, &config.user_agent)?);
    let service = PreviewService::new(cache, store, fetcher, config.service_options());

    info!(
        "Starting previewer on {}:{}",
        config.address, config.port
    );

    previewer::server(figment, config, service).launch().await?;

    Ok(())
}
