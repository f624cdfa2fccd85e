//! Abstraction over the external translation service.

use crate::model::Language;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Result of a single provider translation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTranslation {
    pub translated_text: String,

    /// Source language reported by the provider, if it detected one
    pub detected_source: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to reach translation provider: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider refused the request because of its shape (HTTP 400)
    #[error("translation provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("translation provider error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("translation provider timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected response from translation provider: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Build an error from a non-success HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == 400 {
            ProviderError::Rejected { status, message }
        } else {
            ProviderError::Upstream { status, message }
        }
    }

    /// Network errors, timeouts, 429 and 5xx are transient. Other 4xx are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(_) | ProviderError::Timeout(_) => true,
            ProviderError::Upstream { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Rejected { .. } | ProviderError::InvalidResponse(_) => false,
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, ProviderError::Rejected { .. })
    }
}

/// A remote translation service.
///
/// `source` is `None` when the caller wants the provider to detect the
/// source language.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(
        &self,
        source: Option<&str>,
        target: &str,
        text: &str,
    ) -> Result<ProviderTranslation, ProviderError>;

    async fn supported_languages(&self) -> Result<Vec<Language>, ProviderError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_400_is_rejection() {
        let err = ProviderError::from_status(400, "Invalid Value");
        assert!(err.is_rejection());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_status_other_4xx_is_upstream() {
        for status in [401, 403, 404] {
            let err = ProviderError::from_status(status, "nope");
            assert!(!err.is_rejection(), "{} should not be a rejection", status);
            assert!(!err.is_retryable(), "{} should not be retryable", status);
        }
    }

    #[test]
    fn test_rate_limit_and_server_errors_are_retryable() {
        assert!(ProviderError::from_status(429, "Rate Limit Exceeded").is_retryable());
        assert!(ProviderError::from_status(500, "Internal").is_retryable());
        assert!(ProviderError::from_status(503, "Unavailable").is_retryable());
    }

    #[test]
    fn test_timeout_is_retryable() {
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn test_invalid_response_is_not_retryable() {
        assert!(!ProviderError::InvalidResponse("no translations".to_string()).is_retryable());
    }
}
