//! Supported-language catalog.
//!
//! The catalog is held as an immutable [`CatalogSnapshot`] behind an `Arc`.
//! A refresh builds a complete new snapshot and swaps it in, so readers
//! always see either the old or the new list in full. The snapshot is also
//! persisted to the `languages` table so a restart can start warm.

use crate::db::{Database, StoreError};
use crate::model::Language;
use crate::provider::{ProviderError, TranslationProvider};
use crate::retry::{with_retry_if, RetryConfig};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long the request path waits before retrying a failed refresh while
/// a stale catalog is still available.
const FAILED_REFRESH_BACKOFF: Duration = Duration::from_secs(60);

/// The language list at one point in time.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    languages: Vec<Language>,
    refreshed_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// Build a snapshot, keeping only the first entry for each tag.
    pub fn new(languages: Vec<Language>, refreshed_at: DateTime<Utc>) -> Self {
        let mut seen = HashSet::new();
        let languages = languages
            .into_iter()
            .filter(|language| seen.insert(language.tag.to_lowercase()))
            .collect();

        Self {
            languages,
            refreshed_at,
        }
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    pub fn refreshed_at(&self) -> DateTime<Utc> {
        self.refreshed_at
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    /// First language whose name or tag matches `input`, ignoring case and
    /// surrounding whitespace.
    pub fn find(&self, input: &str) -> Option<&Language> {
        let needle = input.trim();
        if needle.is_empty() {
            return None;
        }
        self.languages.iter().find(|language| language.matches(needle))
    }

    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.is_stale_at(max_age, Utc::now())
    }

    /// A snapshot stamped in the future is never stale.
    pub fn is_stale_at(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.refreshed_at)
            .to_std()
            .map(|age| age > max_age)
            .unwrap_or(false)
    }
}

/// Process-wide language catalog, refreshed from the provider.
pub struct LanguageCatalog {
    provider: Arc<dyn TranslationProvider>,
    db: Database,
    max_age: Duration,
    retry: RetryConfig,
    snapshot: RwLock<Option<Arc<CatalogSnapshot>>>,
    /// Serializes refreshes so concurrent callers share one provider call
    refresh_lock: tokio::sync::Mutex<()>,
    last_failure: Mutex<Option<Instant>>,
}

impl LanguageCatalog {
    pub fn new(provider: Arc<dyn TranslationProvider>, db: Database, max_age: Duration) -> Self {
        Self {
            provider,
            db,
            max_age,
            retry: RetryConfig::catalog_refresh(),
            snapshot: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            last_failure: Mutex::new(None),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Current snapshot, if the catalog has been initialized
    pub fn snapshot(&self) -> Option<Arc<CatalogSnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current language list (empty if not yet initialized)
    pub fn languages(&self) -> Vec<Language> {
        self.snapshot()
            .map(|snapshot| snapshot.languages().to_vec())
            .unwrap_or_default()
    }

    fn replace(&self, snapshot: Arc<CatalogSnapshot>) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    /// Warm the in-memory catalog from the store.
    ///
    /// Returns the number of languages loaded, or `None` if the store holds
    /// no catalog yet.
    pub async fn load_persisted(&self) -> Result<Option<usize>, StoreError> {
        let languages = self.db.load_languages().await?;
        let Some(refreshed_at) = self.db.languages_refreshed_at().await? else {
            return Ok(None);
        };
        if languages.is_empty() {
            return Ok(None);
        }

        let snapshot = CatalogSnapshot::new(languages, refreshed_at);
        let count = snapshot.len();
        self.replace(Arc::new(snapshot));
        info!(
            "Loaded {} languages from store (refreshed at {})",
            count, refreshed_at
        );

        Ok(Some(count))
    }

    /// True if the catalog is absent or older than `max_age`
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.snapshot()
            .map_or(true, |snapshot| snapshot.is_stale(max_age))
    }

    /// Fetch the language list from the provider and swap it in.
    ///
    /// On failure the existing catalog is left untouched.
    pub async fn refresh(&self) -> Result<Arc<CatalogSnapshot>, ProviderError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh only if the catalog is absent or stale.
    ///
    /// Safe to call on every request: concurrent callers wait for a single
    /// in-flight refresh, and a fresh catalog costs no provider call.
    pub async fn ensure_fresh(&self) -> Result<(), ProviderError> {
        if !self.is_stale(self.max_age) {
            return Ok(());
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited
        if !self.is_stale(self.max_age) {
            return Ok(());
        }

        if self.snapshot().is_some() && self.recently_failed() {
            debug!("Skipping catalog refresh, last attempt failed recently");
            return Ok(());
        }

        self.refresh_locked().await.map(|_| ())
    }

    /// Snapshot to serve requests from, refreshing first if needed.
    ///
    /// A stale catalog is still returned when the refresh fails; an error is
    /// returned only if there is no catalog at all.
    pub async fn current(&self) -> Result<Arc<CatalogSnapshot>, ProviderError> {
        match self.ensure_fresh().await {
            Ok(()) => self.snapshot().ok_or_else(|| {
                ProviderError::InvalidResponse("language catalog is not initialized".to_string())
            }),
            Err(e) => match self.snapshot() {
                Some(stale) => {
                    warn!(
                        "Language catalog refresh failed, serving stale catalog from {}: {}",
                        stale.refreshed_at(),
                        e
                    );
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    async fn refresh_locked(&self) -> Result<Arc<CatalogSnapshot>, ProviderError> {
        let result = self.fetch_snapshot().await;

        let snapshot = match result {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                *self.last_failure.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(Instant::now());
                return Err(e);
            }
        };

        if let Err(e) = self
            .db
            .replace_languages(snapshot.languages(), snapshot.refreshed_at())
            .await
        {
            warn!("Failed to persist language catalog: {}", e);
        }

        self.replace(Arc::clone(&snapshot));
        *self.last_failure.lock().unwrap_or_else(PoisonError::into_inner) = None;
        info!("✓ Language catalog refreshed ({} languages)", snapshot.len());

        Ok(snapshot)
    }

    async fn fetch_snapshot(&self) -> Result<CatalogSnapshot, ProviderError> {
        let languages = with_retry_if(
            &self.retry,
            "Language catalog refresh",
            || self.provider.supported_languages(),
            ProviderError::is_retryable,
        )
        .await?;

        let snapshot = CatalogSnapshot::new(languages, Utc::now());
        if snapshot.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "provider returned no supported languages".to_string(),
            ));
        }

        Ok(snapshot)
    }

    fn recently_failed(&self) -> bool {
        self.last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map_or(false, |at| at.elapsed() < FAILED_REFRESH_BACKOFF)
    }
}
