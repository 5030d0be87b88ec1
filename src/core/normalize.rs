//! Case- and accent-insensitive text keys.
//!
//! Recipes are deduplicated by `(creator, name)` after folding both to
//! lowercase ASCII-ish text, so `"José"` / `"jose"` and `"Flan "` / `"flan"`
//! collide.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::CreatorAlias;

/// Maps a Latin letter with a diacritic to its base letter.
fn strip_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' | 'ā' => 'a',
        'é' | 'è' | 'ë' | 'ê' | 'ē' | 'ę' | 'ě' => 'e',
        'í' | 'ì' | 'ï' | 'î' | 'ī' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' | 'ø' | 'ō' | 'ő' => 'o',
        'ú' | 'ù' | 'ü' | 'û' | 'ū' | 'ű' | 'ů' => 'u',
        'ý' | 'ÿ' => 'y',
        'ñ' | 'ń' | 'ň' => 'n',
        'ç' | 'ć' | 'č' => 'c',
        'ś' | 'š' => 's',
        'ź' | 'ż' | 'ž' => 'z',
        'ł' => 'l',
        'ř' => 'r',
        'ď' => 'd',
        'ť' => 't',
        'ğ' => 'g',
        _ => c,
    }
}

/// Lowercases, strips diacritics and collapses whitespace.
///
/// ```
/// use recipack::core::normalize::fold;
///
/// assert_eq!(fold("  Gulyás   Leves "), "gulyas leves");
/// assert_eq!(fold("JOSÉ"), "jose");
/// ```
pub fn fold(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered.chars().map(strip_diacritic).collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized `(creator, name)` pair identifying a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DedupKey {
    /// Folded creator.
    pub creator: String,
    /// Folded recipe name.
    pub name: String,
}

impl DedupKey {
    /// Builds a key from raw creator and name.
    pub fn new(creator: &str, name: &str) -> Self {
        Self {
            creator: fold(creator),
            name: fold(name),
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.creator, self.name)
    }
}

/// Resolves creator spellings through an alias table.
#[derive(Debug, Clone, Default)]
pub struct CreatorAliases {
    entries: Vec<(String, String)>,
}

impl CreatorAliases {
    /// Indexes an alias table by folded variant.
    pub fn new(aliases: &[CreatorAlias]) -> Self {
        let mut entries = Vec::new();
        for alias in aliases {
            entries.push((fold(&alias.canonical), alias.canonical.clone()));
            for variant in &alias.variants {
                entries.push((fold(variant), alias.canonical.clone()));
            }
        }
        Self { entries }
    }

    /// Returns the canonical spelling of `creator`, or `creator` trimmed.
    pub fn resolve(&self, creator: &str) -> String {
        let key = fold(creator);
        self.entries
            .iter()
            .find(|(variant, _)| *variant == key)
            .map(|(_, canonical)| canonical.clone())
            .unwrap_or_else(|| creator.trim().to_string())
    }
}
