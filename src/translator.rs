//! Translation pipeline: validate, resolve, consult the cache, call the
//! provider on a miss, then remember the result.

use crate::cache::TranslationCache;
use crate::catalog::LanguageCatalog;
use crate::error::TranslateError;
use crate::model::Translation;
use crate::provider::{ProviderError, ProviderTranslation, TranslationProvider};
use crate::resolver::{is_blank, Resolver};
use crate::retry::{with_retry_if, RetryConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct Translator {
    catalog: Arc<LanguageCatalog>,
    cache: TranslationCache,
    provider: Arc<dyn TranslationProvider>,
    timeout: Duration,
    retry: RetryConfig,
}

impl Translator {
    pub fn new(
        catalog: Arc<LanguageCatalog>,
        cache: TranslationCache,
        provider: Arc<dyn TranslationProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            cache,
            provider,
            timeout,
            retry: RetryConfig::provider_call(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Translate `text` into `target_input`.
    ///
    /// Both language arguments may be a display name or a tag. A blank
    /// `source_input` asks the provider to detect the source language.
    pub async fn translate(
        &self,
        source_input: &str,
        target_input: &str,
        text: &str,
    ) -> Result<Translation, TranslateError> {
        if is_blank(target_input) {
            return Err(TranslateError::NoTargetLanguage);
        }
        if is_blank(text) {
            return Err(TranslateError::NoText);
        }

        let snapshot = self
            .catalog
            .current()
            .await
            .map_err(TranslateError::ProviderUnavailable)?;
        let resolver = Resolver::new(&snapshot);

        let target = resolver.resolve_target(target_input)?;
        let source = resolver.resolve_source(source_input)?;

        match self.cache.lookup(source.as_deref(), &target, text).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(e) => warn!("Translation cache lookup failed, treating as miss: {}", e),
        }

        let result = with_retry_if(
            &self.retry,
            "Provider translation",
            || self.call_provider(source.as_deref(), &target, text),
            ProviderError::is_retryable,
        )
        .await
        .map_err(|e| {
            if e.is_rejection() {
                debug!("Provider rejected {} -> {}: {}", source_input, target_input, e);
                TranslateError::InvalidLanguage {
                    input: target_input.to_string(),
                }
            } else {
                TranslateError::ProviderUnavailable(e)
            }
        })?;

        let (source_tag, detected) = match (source, result.detected_source) {
            (Some(source), _) => (source, false),
            (None, Some(detected)) => (resolver.canonicalize_detected(&detected), true),
            (None, None) => (String::new(), false),
        };

        let translation = Translation {
            source_tag,
            target_tag: target,
            original: text.to_string(),
            translated: result.translated_text,
        };

        let stored = if detected {
            self.cache.store_detected(&translation).await
        } else {
            self.cache.store(&translation).await
        };
        if let Err(e) = stored {
            warn!("Failed to cache translation: {}", e);
        }

        info!(
            "Translated {} chars {} -> {}",
            text.chars().count(),
            if translation.source_tag.is_empty() {
                "auto"
            } else {
                translation.source_tag.as_str()
            },
            translation.target_tag
        );

        Ok(translation)
    }

    /// One provider attempt, bounded by the configured timeout
    async fn call_provider(
        &self,
        source: Option<&str>,
        target: &str,
        text: &str,
    ) -> Result<ProviderTranslation, ProviderError> {
        tokio::time::timeout(self.timeout, self.provider.translate(source, target, text))
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))?
    }
}
