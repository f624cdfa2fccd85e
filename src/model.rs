//! Core data types shared by the catalog, cache, and HTTP layers.

use serde::{Deserialize, Serialize};

/// A language supported by the translation provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Human-readable display name (e.g., "French")
    pub name: String,

    /// Canonical language tag (e.g., "fr", "zh-TW")
    pub tag: String,
}

impl Language {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Case-insensitive match against either the tag or the display name.
    pub fn matches(&self, input: &str) -> bool {
        eq_ignore_case(&self.tag, input) || eq_ignore_case(&self.name, input)
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

/// A completed translation, as returned to callers and stored in the cache.
///
/// `source_tag` is empty only when the provider could not report the
/// language it detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    #[serde(rename = "from")]
    pub source_tag: String,

    #[serde(rename = "to")]
    pub target_tag: String,

    pub original: String,

    pub translated: String,
}
