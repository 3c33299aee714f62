//! Event categories a watch forwards, and how requested lists resolve into them.
//!
//! Subscribers pick categories with short tokens (`CRfile`, `MVdir`, ...)
//! passed as repeated `enable` / `disable` query parameters.

use bitflags::bitflags;

/// Sentinel accepted in the `disable` list meaning "disable everything".
pub const DISABLE_ALL: &str = "all";

bitflags! {
    /// Set of event categories a watch forwards to its subscribers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventCategories: u8 {
        const CREATED_FILE = 1 << 0;
        const CREATED_DIR = 1 << 1;
        const MODIFIED_FILE = 1 << 2;
        const MODIFIED_DIR = 1 << 3;
        const MOVED_FILE = 1 << 4;
        const MOVED_DIR = 1 << 5;
        const DELETED_FILE = 1 << 6;
        const DELETED_DIR = 1 << 7;
    }
}

const TOKENS: [(&str, EventCategories); 8] = [
    ("CRfile", EventCategories::CREATED_FILE),
    ("CRdir", EventCategories::CREATED_DIR),
    ("MDfile", EventCategories::MODIFIED_FILE),
    ("MDdir", EventCategories::MODIFIED_DIR),
    ("MVfile", EventCategories::MOVED_FILE),
    ("MVdir", EventCategories::MOVED_DIR),
    ("DLfile", EventCategories::DELETED_FILE),
    ("DLdir", EventCategories::DELETED_DIR),
];

impl Default for EventCategories {
    fn default() -> Self {
        Self::all()
    }
}

impl EventCategories {
    /// Parse a single category token. Matching is case-sensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        TOKENS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, flag)| *flag)
    }

    /// Token names of every category in this set.
    pub fn tokens(&self) -> Vec<&'static str> {
        TOKENS
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Resolve requested `enable` / `disable` lists into a category set.
    ///
    /// - both lists empty: every category
    /// - `disable` contains `all`: only the valid tokens of `enable`
    /// - otherwise: every category minus `disable`; `enable` is ignored
    ///
    /// Unknown tokens are ignored. The result may be empty.
    pub fn resolve<S: AsRef<str>>(enable: &[S], disable: &[S]) -> Self {
        if enable.is_empty() && disable.is_empty() {
            return Self::default();
        }

        if disable.iter().any(|d| d.as_ref() == DISABLE_ALL) {
            return Self::collect(enable);
        }

        Self::default() - Self::collect(disable)
    }

    fn collect<S: AsRef<str>>(tokens: &[S]) -> Self {
        tokens
            .iter()
            .filter_map(|t| Self::from_token(t.as_ref()))
            .fold(Self::empty(), |acc, flag| acc | flag)
    }
}
