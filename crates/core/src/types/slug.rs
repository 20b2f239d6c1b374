//! URL slugs derived from store names.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A URL-safe, human-readable identifier derived from a name.
///
/// Slugs contain only lowercase ASCII letters, digits and single `-`
/// separators. Deriving a slug is deterministic: the same name always yields
/// the same slug. Uniqueness is *not* guaranteed by this type; see
/// [`Slug::deduplicate`].
///
/// ```
/// use delicious_core::Slug;
///
/// assert_eq!(Slug::from_name("Wes's Pizza & Beer!").as_str(), "wess-pizza-beer");
/// assert_eq!(Slug::from_name("  Café Crème ").as_str(), "cafe-creme");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Slug used when a name contains no sluggable characters at all.
    pub const FALLBACK: &'static str = "store";

    /// Derive a slug from a display name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let mut slug = String::with_capacity(name.len());
        let mut pending_dash = false;

        for c in name.chars() {
            if matches!(c, '\'' | '\u{2019}') {
                continue;
            }

            let folded = fold_char(c);
            if folded.is_empty() {
                pending_dash = true;
                continue;
            }

            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push_str(&folded);
        }

        if slug.is_empty() {
            slug.push_str(Self::FALLBACK);
        }

        Self(slug)
    }

    /// Wrap an already-derived slug read back from storage.
    #[must_use]
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The case-insensitive regular expression matching every variant of
    /// this slug, for storage engines that evaluate it themselves.
    #[must_use]
    pub fn variant_pattern(&self) -> String {
        format!("^({})(-[0-9]*)?$", self.0)
    }

    /// Pick the slug to store given how many existing slugs are variants of
    /// this one.
    ///
    /// With no collisions the slug is kept as is; otherwise it becomes
    /// `{slug}-{collisions + 1}`. Two writers counting concurrently can
    /// still pick the same suffix.
    #[must_use]
    pub fn deduplicate(self, collisions: usize) -> Self {
        if collisions == 0 {
            self
        } else {
            Self(format!("{}-{}", self.0, collisions + 1))
        }
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Lowercase ASCII rendition of a character, empty for separators.
fn fold_char(c: char) -> String {
    if c.is_ascii_alphanumeric() {
        return c.to_ascii_lowercase().to_string();
    }

    let folded = match c.to_lowercase().next().unwrap_or(c) {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'ł' => "l",
        'ñ' | 'ń' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => "o",
        'œ' => "oe",
        'ß' => "ss",
        'ś' | 'š' => "s",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        _ => "",
    };

    folded.to_owned()
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
