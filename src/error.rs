use crate::db::StoreError;
use crate::provider::ProviderError;
use thiserror::Error;

/// Errors returned by the translation pipeline.
///
/// The first three variants are caused by the caller's input; the rest are
/// failures of a dependency (the provider or the local store).
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("no translation text provided")]
    NoText,

    #[error("no translation language provided")]
    NoTargetLanguage,

    #[error("invalid or unsupported language: {input}")]
    InvalidLanguage { input: String },

    #[error("translation provider unavailable: {0}")]
    ProviderUnavailable(#[source] ProviderError),

    #[error("storage error: {0}")]
    Persistence(#[from] StoreError),
}

impl TranslateError {
    /// True when the request itself was malformed, as opposed to a dependency failing
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TranslateError::NoText
                | TranslateError::NoTargetLanguage
                | TranslateError::InvalidLanguage { .. }
        )
    }
}
