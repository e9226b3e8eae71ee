//! Category slug normalization.
//!
//! The catalog reports category display names (`"Mobile Devices (12)"`) and
//! product URLs with a category path segment (`"Mobile-Devices"`). Both are
//! reduced to the same [`NormalizedSlug`] so they can be joined.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Innermost parenthetical group with any leading whitespace.
static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^()]*\)").expect("parenthetical pattern is valid"));

/// Runs of whitespace and hyphens.
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-]+").expect("separator pattern is valid"));

/// A normalized, URL-safe form of a category label.
///
/// Normalization is: lowercase, strip parenthetical groups, collapse runs of
/// whitespace (and hyphens) into a single hyphen, trim trailing hyphens.
/// It is idempotent.
///
/// ```
/// use itu_shop_core::NormalizedSlug;
///
/// assert_eq!(
///     NormalizedSlug::new("Mobile Devices (12)"),
///     NormalizedSlug::new("mobile-devices"),
/// );
/// assert!(NormalizedSlug::new("").is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedSlug(String);

impl NormalizedSlug {
    /// Normalize a category name or URL segment.
    #[must_use]
    pub fn new(label: &str) -> Self {
        let mut value = label.to_lowercase();

        // Nested groups need one pass per level.
        loop {
            let stripped = PARENTHETICAL.replace_all(&value, "");
            if stripped == value {
                break;
            }
            value = stripped.into_owned();
        }

        let collapsed = SEPARATORS.replace_all(value.trim(), "-");
        Self(collapsed.trim_end_matches('-').to_owned())
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the label normalized to nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
