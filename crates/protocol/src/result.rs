use crate::Code;
use serde::{Deserialize, Serialize};

/// Title shown for codes no lookup source knows about.
pub const NOT_FOUND_TITLE: &str = "not found";

/// A resolved code. `url` is `None` for modules that are known but have no
/// live course page (discontinued, archive-only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleResult {
    pub code: Code,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ModuleResult {
    pub fn new(code: Code, title: impl Into<String>, url: Option<String>) -> Self {
        Self {
            code,
            title: title.into(),
            url,
        }
    }

    pub fn cache_entry(&self) -> CacheEntry {
        CacheEntry::new(self.title.clone(), self.url.clone())
    }
}

/// Cached `(title, url)` pair, stored on disk as a two element JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, Option<String>)", into = "(String, Option<String>)")]
pub struct CacheEntry {
    pub title: String,
    pub url: Option<String>,
}

impl CacheEntry {
    pub fn new(title: impl Into<String>, url: Option<String>) -> Self {
        Self {
            title: title.into(),
            url,
        }
    }

    pub fn into_result(self, code: Code) -> ModuleResult {
        ModuleResult::new(code, self.title, self.url)
    }

    /// Whether `self` should overwrite `existing`.
    ///
    /// Only entries carrying a url replace what is cached: a url is never
    /// dropped and a url-less title never displaces an earlier one.
    pub fn supersedes(&self, existing: &CacheEntry) -> bool {
        self.url.is_some() && self != existing
    }
}

impl From<(String, Option<String>)> for CacheEntry {
    fn from((title, url): (String, Option<String>)) -> Self {
        Self { title, url }
    }
}

impl From<CacheEntry> for (String, Option<String>) {
    fn from(entry: CacheEntry) -> Self {
        (entry.title, entry.url)
    }
}

/// Outcome of resolving one code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(ModuleResult),
    NotFound(Code),
}

impl Lookup {
    pub fn code(&self) -> &Code {
        match self {
            Self::Found(result) => &result.code,
            Self::NotFound(code) => code,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// The result to display, with a placeholder title for unknown codes.
    pub fn to_display(&self) -> ModuleResult {
        match self {
            Self::Found(result) => result.clone(),
            Self::NotFound(code) => ModuleResult::new(code.clone(), NOT_FOUND_TITLE, None),
        }
    }
}

impl From<(Code, Option<ModuleResult>)> for Lookup {
    fn from((code, result): (Code, Option<ModuleResult>)) -> Self {
        match result {
            Some(result) => Self::Found(result),
            None => Self::NotFound(code),
        }
    }
}
