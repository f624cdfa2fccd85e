//! Maps user-supplied language names or tags onto canonical catalog tags.

use crate::catalog::CatalogSnapshot;
use crate::error::TranslateError;

/// Check if a string is empty or whitespace only
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Resolves language input against one catalog snapshot.
pub struct Resolver<'a> {
    snapshot: &'a CatalogSnapshot,
}

impl<'a> Resolver<'a> {
    pub fn new(snapshot: &'a CatalogSnapshot) -> Self {
        Self { snapshot }
    }

    /// Resolve a name or tag to its canonical tag.
    ///
    /// The error carries the input exactly as supplied.
    pub fn resolve(&self, input: &str) -> Result<String, TranslateError> {
        self.snapshot
            .find(input)
            .map(|language| language.tag.clone())
            .ok_or_else(|| TranslateError::InvalidLanguage {
                input: input.to_string(),
            })
    }

    /// The target language is always required
    pub fn resolve_target(&self, input: &str) -> Result<String, TranslateError> {
        if is_blank(input) {
            return Err(TranslateError::NoTargetLanguage);
        }
        self.resolve(input)
    }

    /// A blank source means "auto-detect" and resolves to `None`
    pub fn resolve_source(&self, input: &str) -> Result<Option<String>, TranslateError> {
        if is_blank(input) {
            return Ok(None);
        }
        self.resolve(input).map(Some)
    }

    /// Canonical tag for a provider-detected language. Tags missing from the
    /// catalog are kept as reported.
    pub fn canonicalize_detected(&self, detected: &str) -> String {
        self.snapshot
            .find(detected)
            .map(|language| language.tag.clone())
            .unwrap_or_else(|| detected.trim().to_string())
    }
}
