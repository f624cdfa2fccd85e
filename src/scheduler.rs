use crate::cache::TranslationCache;
use crate::catalog::LanguageCatalog;
use crate::config::Config;
use crate::db::StoreError;
use crate::provider::ProviderError;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Initialize and start the maintenance scheduler.
///
/// Cron expressions use the six-field form with seconds, evaluated in UTC.
pub async fn start_scheduler(
    config: &Config,
    catalog: Arc<LanguageCatalog>,
    cache: TranslationCache,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    info!(
        "Scheduling language catalog refresh (cron: {})",
        config.catalog_refresh_cron
    );
    let refresh_job = Job::new_async(config.catalog_refresh_cron.as_str(), move |_uuid, _l| {
        let catalog = Arc::clone(&catalog);

        Box::pin(async move {
            info!("⏰ Scheduled catalog refresh triggered");
            if let Err(e) = run_catalog_refresh(&catalog).await {
                error!("Scheduled catalog refresh failed: {}", e);
            }
        })
    })
    .with_context(|| {
        format!(
            "Invalid CATALOG_REFRESH_CRON expression: {}",
            config.catalog_refresh_cron
        )
    })?;
    scheduler.add(refresh_job).await?;

    info!(
        "Scheduling translation cache reset (cron: {})",
        config.cache_reset_cron
    );
    let reset_job = Job::new_async(config.cache_reset_cron.as_str(), move |_uuid, _l| {
        let cache = cache.clone();

        Box::pin(async move {
            info!("⏰ Scheduled cache reset triggered");
            if let Err(e) = run_cache_reset(&cache).await {
                error!("Scheduled cache reset failed: {}", e);
            }
        })
    })
    .with_context(|| format!("Invalid CACHE_RESET_CRON expression: {}", config.cache_reset_cron))?;
    scheduler.add(reset_job).await?;

    scheduler.start().await?;
    info!("✓ Scheduler started");

    Ok(scheduler)
}

/// Refresh the language catalog now (also used by the admin endpoint).
///
/// Returns the number of languages in the new catalog.
pub async fn run_catalog_refresh(catalog: &LanguageCatalog) -> Result<usize, ProviderError> {
    info!("Starting language catalog refresh");
    let snapshot = catalog.refresh().await?;
    Ok(snapshot.len())
}

/// Drop every cached translation now (also used by the admin endpoint).
pub async fn run_cache_reset(cache: &TranslationCache) -> Result<u64, StoreError> {
    info!("Starting translation cache reset");
    cache.reset_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_CACHE_RESET_CRON, DEFAULT_CATALOG_REFRESH_CRON};
    use crate::db::Database;
    use crate::model::{Language, Translation};
    use crate::provider::testing::FakeProvider;
    use crate::retry::RetryConfig;
    use std::time::Duration;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    async fn create_db(temp_dir: &TempDir) -> Database {
        let db_path = temp_dir.path().join("scheduler.db");
        Database::new(db_path.to_str().unwrap())
            .await
            .expect("Failed to create database")
    }

    fn test_config(catalog_cron: &str, cache_cron: &str) -> Config {
        Config {
            environment: "test".to_string(),
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            provider_api_key: "test-key".to_string(),
            provider_api_url: "http://127.0.0.1:1".to_string(),
            provider_timeout_secs: 1,
            display_language: "en".to_string(),
            catalog_max_age_hours: 24,
            catalog_refresh_cron: catalog_cron.to_string(),
            cache_reset_cron: cache_cron.to_string(),
            api_key: None,
        }
    }

    #[tokio::test]
    async fn test_default_cron_expressions_parse() {
        let catalog_job = Job::new_async(DEFAULT_CATALOG_REFRESH_CRON, |_uuid, _l| {
            Box::pin(async {})
        });
        let cache_job = Job::new_async(DEFAULT_CACHE_RESET_CRON, |_uuid, _l| Box::pin(async {}));

        assert!(catalog_job.is_ok());
        assert!(cache_job.is_ok());
    }

    #[tokio::test]
    async fn test_run_catalog_refresh_replaces_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let db = create_db(&temp_dir).await;
        let provider = Arc::new(FakeProvider::english_french());
        let catalog = LanguageCatalog::new(provider.clone(), db, DAY)
            .with_retry(RetryConfig::disabled());

        assert_eq!(run_catalog_refresh(&catalog).await.unwrap(), 2);

        provider.set_languages(vec![Language::new("German", "de")]);
        assert_eq!(run_catalog_refresh(&catalog).await.unwrap(), 1);
        assert_eq!(catalog.languages(), vec![Language::new("German", "de")]);
    }

    #[tokio::test]
    async fn test_run_catalog_refresh_failure_keeps_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let db = create_db(&temp_dir).await;
        let provider = Arc::new(FakeProvider::english_french());
        let catalog = LanguageCatalog::new(provider.clone(), db, DAY)
            .with_retry(RetryConfig::disabled());
        run_catalog_refresh(&catalog).await.unwrap();

        provider.set_failing(true);
        assert!(run_catalog_refresh(&catalog).await.is_err());
        assert_eq!(catalog.languages().len(), 2);
    }

    #[tokio::test]
    async fn test_run_cache_reset() {
        let temp_dir = TempDir::new().unwrap();
        let cache = TranslationCache::new(create_db(&temp_dir).await);
        cache
            .store(&Translation {
                source_tag: "en".to_string(),
                target_tag: "fr".to_string(),
                original: "hello".to_string(),
                translated: "bonjour".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(run_cache_reset(&cache).await.unwrap(), 1);
        assert!(cache.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_start_scheduler_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let db = create_db(&temp_dir).await;
        let catalog = Arc::new(LanguageCatalog::new(
            Arc::new(FakeProvider::english_french()),
            db.clone(),
            DAY,
        ));
        let config = test_config(DEFAULT_CATALOG_REFRESH_CRON, DEFAULT_CACHE_RESET_CRON);

        let mut scheduler = start_scheduler(&config, catalog, TranslationCache::new(db))
            .await
            .expect("Scheduler should start");

        scheduler.shutdown().await.expect("Scheduler should stop");
    }

    #[tokio::test]
    async fn test_start_scheduler_rejects_invalid_cron() {
        let temp_dir = TempDir::new().unwrap();
        let db = create_db(&temp_dir).await;
        let catalog = Arc::new(LanguageCatalog::new(
            Arc::new(FakeProvider::english_french()),
            db.clone(),
            DAY,
        ));
        let config = test_config("every day please", DEFAULT_CACHE_RESET_CRON);

        let err = match start_scheduler(&config, catalog, TranslationCache::new(db)).await {
            Ok(_) => panic!("Invalid cron expression should be rejected"),
            Err(e) => e,
        };

        assert!(err.to_string().contains("CATALOG_REFRESH_CRON"));
    }
}
