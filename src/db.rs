use crate::model::{Language, Translation};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database at {url}: {source}")]
    Open {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("database query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// SQLite store holding the language catalog and the translation cache.
///
/// Every statement binds its values as parameters; user-supplied strings are
/// never interpolated into SQL.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database and create tables
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let open_error = |source| StoreError::Open {
            url: database_url.to_string(),
            source,
        };

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(open_error)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(open_error)?;

        let db = Self { pool };
        db.create_tables().await?;
        info!("✓ Database ready at {}", database_url);

        Ok(db)
    }

    async fn create_tables(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS languages (
                tag TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                refreshed_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS translations (
                source_tag TEXT NOT NULL,
                target_tag TEXT NOT NULL,
                original TEXT NOT NULL,
                translated TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                detected INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (source_tag, target_tag, original)
            )",
        )
        .execute(&self.pool)
        .await?;

        // Databases created before the `detected` column existed
        let has_detected: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('translations') WHERE name = 'detected'",
        )
        .fetch_one(&self.pool)
        .await?;
        if has_detected == 0 {
            sqlx::query(
                "ALTER TABLE translations ADD COLUMN detected INTEGER NOT NULL DEFAULT 0",
            )
            .execute(&self.pool)
            .await?;
        }

        // Auto-detect lookups ignore the source tag
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_translations_target_original
             ON translations (target_tag, original)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ==================== Languages ====================

    /// Replace the whole languages table in a single transaction
    pub async fn replace_languages(
        &self,
        languages: &[Language],
        refreshed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM languages")
            .execute(&mut *tx)
            .await?;

        for language in languages {
            sqlx::query(
                "INSERT OR REPLACE INTO languages (tag, name, refreshed_at) VALUES (?1, ?2, ?3)",
            )
            .bind(&language.tag)
            .bind(&language.name)
            .bind(refreshed_at.timestamp())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Load languages in the order they were inserted
    pub async fn load_languages(&self) -> Result<Vec<Language>, StoreError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT name, tag FROM languages ORDER BY rowid")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(name, tag)| Language { name, tag })
            .collect())
    }

    /// Oldest refresh timestamp among stored languages, if any are stored
    pub async fn languages_refreshed_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let timestamp: Option<i64> = sqlx::query_scalar("SELECT MIN(refreshed_at) FROM languages")
            .fetch_one(&self.pool)
            .await?;

        Ok(timestamp.and_then(|secs| DateTime::from_timestamp(secs, 0)))
    }

    // ==================== Translations ====================

    /// Exact lookup by (source, target, original)
    pub async fn find_translation(
        &self,
        source_tag: &str,
        target_tag: &str,
        original: &str,
    ) -> Result<Option<Translation>, StoreError> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT source_tag, target_tag, original, translated FROM translations
             WHERE source_tag = ?1 AND target_tag = ?2 AND original = ?3",
        )
        .bind(source_tag)
        .bind(target_tag)
        .bind(original)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(into_translation))
    }

    /// Most recent translation of `original` into `target_tag` whose source
    /// was detected by the provider. Rows stored under a caller-chosen
    /// source never answer an auto-detect request.
    pub async fn find_detected_translation(
        &self,
        target_tag: &str,
        original: &str,
    ) -> Result<Option<Translation>, StoreError> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT source_tag, target_tag, original, translated FROM translations
             WHERE target_tag = ?1 AND original = ?2 AND detected = 1
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1",
        )
        .bind(target_tag)
        .bind(original)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(into_translation))
    }

    /// Insert a translation, overwriting any existing row with the same key.
    ///
    /// `detected` marks a source language reported by the provider. Once a
    /// row is marked detected it stays so.
    pub async fn upsert_translation(
        &self,
        translation: &Translation,
        detected: bool,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO translations
                (source_tag, target_tag, original, translated, created_at, detected)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (source_tag, target_tag, original)
             DO UPDATE SET translated = excluded.translated,
                           created_at = excluded.created_at,
                           detected = MAX(detected, excluded.detected)",
        )
        .bind(&translation.source_tag)
        .bind(&translation.target_tag)
        .bind(&translation.original)
        .bind(&translation.translated)
        .bind(Utc::now().timestamp())
        .bind(detected)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete every cached translation, returning the number removed
    pub async fn delete_all_translations(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM translations")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn translation_count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM translations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

fn into_translation(
    (source_tag, target_tag, original, translated): (String, String, String, String),
) -> Translation {
    Translation {
        source_tag,
        target_tag,
        original,
        translated,
    }
}
