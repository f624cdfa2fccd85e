use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use translate_proxy::{
    cache::TranslationCache,
    catalog::LanguageCatalog,
    config::Config,
    db::Database,
    google::GoogleTranslateClient,
    provider::TranslationProvider,
    scheduler,
    server::{self, AppState},
    translator::Translator,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("translate_proxy=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    info!("Starting translate-proxy ({})", config.environment);

    let db = Database::new(&config.database_url)
        .await
        .context("Failed to open database")?;

    let provider: Arc<dyn TranslationProvider> =
        Arc::new(GoogleTranslateClient::from_config(&config)?);

    // Warm the catalog from the store, then top it up from the provider if stale
    let catalog = Arc::new(LanguageCatalog::new(
        Arc::clone(&provider),
        db.clone(),
        config.catalog_max_age(),
    ));
    match catalog.load_persisted().await {
        Ok(Some(_)) => {}
        Ok(None) => info!("No persisted language catalog, fetching from provider"),
        Err(e) => warn!("Failed to load persisted language catalog: {}", e),
    }
    if let Err(e) = catalog.ensure_fresh().await {
        warn!("Initial language catalog refresh failed, will retry on demand: {}", e);
    }

    let cache = TranslationCache::new(db);
    let translator = Arc::new(Translator::new(
        Arc::clone(&catalog),
        cache.clone(),
        provider,
        config.provider_timeout(),
    ));

    let _scheduler =
        scheduler::start_scheduler(&config, Arc::clone(&catalog), cache.clone()).await?;

    let state = AppState {
        translator,
        catalog,
        cache,
        api_key: config.api_key.clone(),
    };
    if state.api_key.is_none() {
        info!("API_KEY not set, admin endpoints disabled");
    }

    server::serve(&config, state).await
}
