use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 1-6 letters, 1-3 digits, optional `-SUFFIX` (e.g. `M269`, `TM112`, `SXF206-C`).
pub const MODULE_CODE_PATTERN: &str = r"[a-zA-Z]{1,6}[0-9]{1,3}(?:-[a-zA-Z]{1,5})?";

/// 1 letter, 2 digits, optional `-SUFFIX` (e.g. `Q62`), or the `QD` sentinel.
pub const QUALIFICATION_CODE_PATTERN: &str = r"[a-zA-Z][0-9]{2}(?:-[a-zA-Z]{1,5})?|[qQ][dD]";

/// Either shape, grouped so it can be embedded in larger expressions.
/// The module alternative is tried first.
pub static CODE_PATTERN: Lazy<String> =
    Lazy::new(|| format!("(?:{MODULE_CODE_PATTERN}|{QUALIFICATION_CODE_PATTERN})"));

static CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}$", *CODE_PATTERN)).expect("valid code regex"));

static QUALIFICATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^(?:{QUALIFICATION_CODE_PATTERN})$")).expect("valid qualification regex")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid module or qualification code: {0:?}")]
pub struct InvalidCode(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeKind {
    Module,
    Qualification,
}

/// A validated course code in canonical (upper-case) form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code(String);

impl Code {
    /// Validate `raw` against the code shapes and upper-case it.
    pub fn parse(raw: &str) -> Result<Self, InvalidCode> {
        let trimmed = raw.trim();
        if CODE_RE.is_match(trimmed) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(InvalidCode(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-case form used inside URLs.
    pub fn slug(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    pub fn kind(&self) -> CodeKind {
        if QUALIFICATION_RE.is_match(&self.0) {
            CodeKind::Qualification
        } else {
            CodeKind::Module
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Code {
    type Error = InvalidCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl std::str::FromStr for Code {
    type Err = InvalidCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.0
    }
}
