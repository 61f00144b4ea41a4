//! URL path type and slug normalization.
//!
//! Internal representation is always decoded and always starts with `/`.

use std::borrow::Borrow;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;

/// Decoded URL path
///
/// Invariants:
/// - Always starts with `/`
/// - Never empty (root is `/`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UrlPath(Arc<str>);

impl UrlPath {
    /// Create a path, normalizing the leading slash.
    pub fn new(path: &str) -> Self {
        let trimmed = path.trim();

        if trimmed.is_empty() || trimmed == "/" {
            return Self(Arc::from("/"));
        }

        if trimmed.starts_with('/') {
            Self(Arc::from(trimmed))
        } else {
            Self(Arc::from(format!("/{trimmed}")))
        }
    }

    /// Build a path from pre-slugged segments: `/{a}/{b}/{c}`.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = String::new();
        for segment in segments {
            let segment = segment.as_ref();
            if segment.is_empty() {
                continue;
            }
            path.push('/');
            path.push_str(segment);
        }

        if path.is_empty() {
            return Self(Arc::from("/"));
        }
        Self(Arc::from(path))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UrlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for UrlPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for UrlPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

// =============================================================================
// Slug
// =============================================================================

/// Maximal runs of non-word characters (everything but `[0-9A-Za-z_]`)
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

/// Normalize human-readable text into a URL-safe slug.
///
/// Lowercases, then collapses every maximal run of non-word characters
/// into a single hyphen: `"The Fifth Season"` -> `"the-fifth-season"`.
pub fn slug(text: &str) -> String {
    let lowered = text.to_lowercase();
    NON_WORD.replace_all(&lowered, "-").into_owned()
}

// =============================================================================
// Tests
// =============================================================================
