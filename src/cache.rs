//! Exact-match translation cache backed by the `translations` table.
//!
//! Entries have no per-entry expiry. The whole cache is reset on a schedule
//! and rebuilt lazily from cache misses.

use crate::db::{Database, StoreError};
use crate::model::Translation;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Clone)]
pub struct TranslationCache {
    db: Database,
    /// Stores hold the shared side, `reset_all` the exclusive side
    gate: Arc<RwLock<()>>,
}

impl TranslationCache {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            gate: Arc::new(RwLock::new(())),
        }
    }

    /// Look up a previous translation.
    ///
    /// With `source` set to `None` (auto-detect) only entries whose source
    /// was detected by the provider match, most recent first.
    pub async fn lookup(
        &self,
        source: Option<&str>,
        target: &str,
        text: &str,
    ) -> Result<Option<Translation>, StoreError> {
        let hit = match source {
            Some(source) => self.db.find_translation(source, target, text).await?,
            None => self.db.find_detected_translation(target, text).await?,
        };

        if hit.is_some() {
            debug!(
                "Cache hit for {} -> {}",
                source.unwrap_or("auto"),
                target
            );
        }

        Ok(hit)
    }

    /// Insert or overwrite the entry for a translation whose source the
    /// caller chose
    pub async fn store(&self, translation: &Translation) -> Result<(), StoreError> {
        let _shared = self.gate.read().await;
        self.db.upsert_translation(translation, false).await
    }

    /// Like [`store`](Self::store), for a source the provider detected.
    /// Only these entries answer later auto-detect lookups.
    pub async fn store_detected(&self, translation: &Translation) -> Result<(), StoreError> {
        let _shared = self.gate.read().await;
        self.db.upsert_translation(translation, true).await
    }

    /// Remove every entry. Waits for in-flight stores to finish first.
    pub async fn reset_all(&self) -> Result<u64, StoreError> {
        let _exclusive = self.gate.write().await;
        let removed = self.db.delete_all_translations().await?;
        info!("✓ Translation cache reset ({} entries removed)", removed);
        Ok(removed)
    }

    pub async fn len(&self) -> Result<u64, StoreError> {
        self.db.translation_count().await
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_cache() -> (TranslationCache, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("cache.db");
        let db = Database::new(db_path.to_str().unwrap())
            .await
            .expect("Failed to create database");
        (TranslationCache::new(db), temp_dir)
    }

    fn hello(source: &str, translated: &str) -> Translation {
        Translation {
            source_tag: source.to_string(),
            target_tag: "fr".to_string(),
            original: "hello".to_string(),
            translated: translated.to_string(),
        }
    }

    #[tokio::test]
    async fn test_lookup_miss_on_empty_cache() {
        let (cache, _temp_dir) = create_cache().await;

        assert!(cache.lookup(Some("en"), "fr", "hello").await.unwrap().is_none());
        assert!(cache.lookup(None, "fr", "hello").await.unwrap().is_none());
        assert!(cache.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let (cache, _temp_dir) = create_cache().await;
        cache.store(&hello("en", "bonjour")).await.unwrap();

        let hit = cache.lookup(Some("en"), "fr", "hello").await.unwrap();
        assert_eq!(hit, Some(hello("en", "bonjour")));
    }

    #[tokio::test]
    async fn test_store_same_key_twice_overwrites() {
        let (cache, _temp_dir) = create_cache().await;
        cache.store(&hello("en", "salut")).await.unwrap();
        cache.store(&hello("en", "bonjour")).await.unwrap();

        assert_eq!(cache.len().await.unwrap(), 1);
        let hit = cache.lookup(Some("en"), "fr", "hello").await.unwrap().unwrap();
        assert_eq!(hit.translated, "bonjour");
    }

    #[tokio::test]
    async fn test_auto_detect_lookup_returns_detected_source() {
        let (cache, _temp_dir) = create_cache().await;
        cache.store_detected(&hello("en", "bonjour")).await.unwrap();

        let hit = cache.lookup(None, "fr", "hello").await.unwrap().unwrap();
        assert_eq!(hit.source_tag, "en");

        // The detected entry also serves callers naming that source
        assert!(cache.lookup(Some("en"), "fr", "hello").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_caller_chosen_source_does_not_answer_auto_detect() {
        let (cache, _temp_dir) = create_cache().await;
        cache.store(&hello("de", "bonjour")).await.unwrap();

        assert!(cache.lookup(None, "fr", "hello").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_explicit_source_does_not_match_other_sources() {
        let (cache, _temp_dir) = create_cache().await;
        cache.store(&hello("en", "bonjour")).await.unwrap();

        assert!(cache.lookup(Some("de"), "fr", "hello").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_all_clears_every_entry() {
        let (cache, _temp_dir) = create_cache().await;
        cache.store(&hello("en", "bonjour")).await.unwrap();
        cache.store(&hello("de", "bonjour")).await.unwrap();

        let removed = cache.reset_all().await.unwrap();

        assert_eq!(removed, 2);
        assert!(cache.lookup(Some("en"), "fr", "hello").await.unwrap().is_none());
        assert!(cache.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_reset_all_on_empty_cache() {
        let (cache, _temp_dir) = create_cache().await;
        assert_eq!(cache.reset_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_racing_reset_is_not_lost_or_duplicated() {
        let (cache, _temp_dir) = create_cache().await;

        let mut handles = Vec::new();
        for i in 0..10 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let translation = Translation {
                    source_tag: "en".to_string(),
                    target_tag: "fr".to_string(),
                    original: format!("text {}", i),
                    translated: format!("texte {}", i),
                };
                cache.store(&translation).await
            }));
        }
        let reset = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.reset_all().await })
        };

        for handle in handles {
            handle.await.expect("task panicked").expect("store failed");
        }
        let removed = reset.await.expect("task panicked").expect("reset failed");

        // Every store landed either before the reset (and was removed) or after it
        let remaining = cache.len().await.unwrap();
        assert_eq!(removed + remaining, 10);
    }
}
