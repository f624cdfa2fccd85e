//! Google Cloud Translation (v2 REST API) provider.

use crate::config::Config;
use crate::model::Language;
use crate::provider::{ProviderError, ProviderTranslation, TranslationProvider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Translation request body
#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: [&'a str; 1],
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct TranslationsData {
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslatedText {
    translated_text: String,
    detected_source_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LanguagesData {
    languages: Vec<LanguageEntry>,
}

#[derive(Debug, Deserialize)]
struct LanguageEntry {
    language: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct GoogleTranslateClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    display_language: String,
}

impl GoogleTranslateClient {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        display_language: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            display_language: display_language.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.provider_timeout())
            .build()
            .context("Failed to build HTTP client for translation provider")?;

        Ok(Self::new(
            client,
            &config.provider_api_url,
            &config.provider_api_key,
            &config.display_language,
        ))
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!(
            "{}/language/translate/v2{}",
            self.api_url.trim_end_matches('/'),
            suffix
        )
    }
}

/// Turn a non-success response into a `ProviderError`, preferring the
/// message from the JSON error body when there is one
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);

    Err(ProviderError::from_status(status.as_u16(), message))
}

#[async_trait]
impl TranslationProvider for GoogleTranslateClient {
    async fn translate(
        &self,
        source: Option<&str>,
        target: &str,
        text: &str,
    ) -> Result<ProviderTranslation, ProviderError> {
        let request = TranslateRequest {
            q: [text],
            target,
            source,
            format: "text",
        };

        debug!(
            "Requesting translation {} -> {} ({} chars)",
            source.unwrap_or("auto"),
            target,
            text.chars().count()
        );

        let response = self
            .client
            .post(self.endpoint(""))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let envelope: Envelope<TranslationsData> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let translation = envelope
            .data
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| {
                ProviderError::InvalidResponse("response contained no translations".to_string())
            })?;

        Ok(ProviderTranslation {
            translated_text: translation.translated_text,
            detected_source: translation
                .detected_source_language
                .filter(|tag| !tag.trim().is_empty()),
        })
    }

    async fn supported_languages(&self) -> Result<Vec<Language>, ProviderError> {
        let response = self
            .client
            .get(self.endpoint("/languages"))
            .query(&[
                ("key", self.api_key.as_str()),
                ("target", self.display_language.as_str()),
            ])
            .send()
            .await?;
        let response = check_status(response).await?;

        let envelope: Envelope<LanguagesData> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(envelope
            .data
            .languages
            .into_iter()
            .map(|entry| {
                let name = entry.name.unwrap_or_else(|| entry.language.clone());
                Language::new(name, entry.language)
            })
            .collect())
    }
}
