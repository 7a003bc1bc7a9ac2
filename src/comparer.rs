//! Identifier comparison.
//!
//! Two identifiers are compared on their schema and local names only; server
//! and database levels never take part. Each component is folded by the
//! comparer's [`TextComparer`] before comparison, and an absent schema on one
//! side is read as the configured default schema.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, SchematicError};
use crate::identifier::{Identifier, IdentifierPart};

/// Unicode format characters (zero-width joiners, soft hyphens, ...) are
/// ignorable under culture-aware comparison.
static IGNORABLE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Cf}").unwrap());

/// How identifier components are matched against each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IdentifierComparisonMode {
    /// Exact code point comparison
    #[default]
    Ordinal,
    /// Code point comparison after simple per-character upper-casing
    OrdinalIgnoreCase,
    /// Case-sensitive, ignoring Unicode format characters
    CultureSensitive,
    /// Full Unicode lower-casing, ignoring Unicode format characters
    CultureInsensitive,
}

impl IdentifierComparisonMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierComparisonMode::Ordinal => "ordinal",
            IdentifierComparisonMode::OrdinalIgnoreCase => "ordinal-ignore-case",
            IdentifierComparisonMode::CultureSensitive => "culture-sensitive",
            IdentifierComparisonMode::CultureInsensitive => "culture-insensitive",
        }
    }
}

impl std::str::FromStr for IdentifierComparisonMode {
    type Err = SchematicError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "ordinal" => Ok(IdentifierComparisonMode::Ordinal),
            "ordinalignorecase" => Ok(IdentifierComparisonMode::OrdinalIgnoreCase),
            "culturesensitive" | "currentculture" => Ok(IdentifierComparisonMode::CultureSensitive),
            "cultureinsensitive" | "currentcultureignorecase" => {
                Ok(IdentifierComparisonMode::CultureInsensitive)
            }
            _ => Err(SchematicError::invalid_argument(format!(
                "Unknown identifier comparison mode: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for IdentifierComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Folds text into a canonical form; two strings match iff their folded
/// forms are equal.
pub trait TextComparer: Send + Sync {
    fn fold<'a>(&self, value: &'a str) -> Cow<'a, str>;
}

/// Built-in folding for each [`IdentifierComparisonMode`]
#[derive(Debug, Clone, Copy)]
pub struct ModeTextComparer(pub IdentifierComparisonMode);

impl TextComparer for ModeTextComparer {
    fn fold<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self.0 {
            IdentifierComparisonMode::Ordinal => Cow::Borrowed(value),
            IdentifierComparisonMode::OrdinalIgnoreCase => {
                if value.chars().all(|c| simple_upper(c) == c) {
                    return Cow::Borrowed(value);
                }
                Cow::Owned(value.chars().map(simple_upper).collect())
            }
            IdentifierComparisonMode::CultureSensitive => IGNORABLE_CHARS.replace_all(value, ""),
            IdentifierComparisonMode::CultureInsensitive => {
                Cow::Owned(IGNORABLE_CHARS.replace_all(value, "").to_lowercase())
            }
        }
    }
}

/// Upper-case a character only when it maps to exactly one character.
fn simple_upper(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// Folded schema/local pair usable as a hash-map key.
///
/// Two keys produced by the same comparer are equal iff the comparer
/// considers the source identifiers equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentifierKey {
    schema: Option<String>,
    local: String,
}

/// Equality, hashing and ordering of identifiers under one comparison mode
#[derive(Clone)]
pub struct IdentifierComparer {
    text: Arc<dyn TextComparer>,
    default_schema: Option<String>,
}

impl fmt::Debug for IdentifierComparer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentifierComparer")
            .field("default_schema", &self.default_schema)
            .finish_non_exhaustive()
    }
}

impl Default for IdentifierComparer {
    fn default() -> Self {
        Self::new(IdentifierComparisonMode::Ordinal, None)
    }
}

impl IdentifierComparer {
    pub fn new(mode: IdentifierComparisonMode, default_schema: Option<&str>) -> Self {
        Self::with_text_comparer(Arc::new(ModeTextComparer(mode)), default_schema)
    }

    /// Build a comparer from a mode name such as `"ordinal-ignore-case"`.
    pub fn for_mode_name(mode: &str, default_schema: Option<&str>) -> Result<Self> {
        let mode = mode
            .parse::<IdentifierComparisonMode>()
            .map_err(|err| SchematicError::InvalidOperation {
                message: err.to_string(),
            })?;
        Ok(Self::new(mode, default_schema))
    }

    pub fn with_text_comparer(text: Arc<dyn TextComparer>, default_schema: Option<&str>) -> Self {
        Self {
            text,
            default_schema: default_schema
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string),
        }
    }

    pub fn default_schema(&self) -> Option<&str> {
        self.default_schema.as_deref()
    }

    /// Folded comparison key for `name`, with an absent schema replaced by
    /// the default schema when one is configured.
    pub fn key(&self, name: &Identifier) -> IdentifierKey {
        let schema = name
            .schema()
            .or(self.default_schema.as_deref())
            .map(|s| self.text.fold(s).into_owned());
        IdentifierKey {
            schema,
            local: self.text.fold(name.local()).into_owned(),
        }
    }

    /// `None` equals `None`; `None` never equals a name.
    pub fn equals(&self, a: Option<&Identifier>, b: Option<&Identifier>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => self.key(a) == self.key(b),
            _ => false,
        }
    }

    /// Deterministic hash over the folded schema and local names; `0` for
    /// `None`.
    pub fn hash(&self, name: Option<&Identifier>) -> u64 {
        match name {
            None => 0,
            Some(name) => {
                let mut hasher = DefaultHasher::new();
                self.key(name).hash(&mut hasher);
                hasher.finish()
            }
        }
    }

    /// Total order consistent with [`equals`](Self::equals): schema first
    /// (absent schema sorts first), then local name.
    pub fn compare(&self, a: &Identifier, b: &Identifier) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }

    /// Single-level names match when they denote the same level and their
    /// folded values are equal.
    pub fn part_equals(&self, a: Option<&IdentifierPart>, b: Option<&IdentifierPart>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.level() == b.level() && self.text.fold(a.value()) == self.text.fold(b.value())
            }
            _ => false,
        }
    }

    pub fn hash_part(&self, part: Option<&IdentifierPart>) -> u64 {
        match part {
            None => 0,
            Some(part) => {
                let mut hasher = DefaultHasher::new();
                part.level().hash(&mut hasher);
                self.text.fold(part.value()).hash(&mut hasher);
                hasher.finish()
            }
        }
    }
}
