use once_cell::sync::Lazy;
use oumodules_protocol::{Code, CODE_PATTERN};
use regex::Regex;
use std::collections::HashSet;

/// Upper bound of codes looked up per message.
pub const MODULES_COUNT_LIMIT: usize = 5;

/// Marker that turns a code into a mention, e.g. `!M269`.
pub const MENTION_MARKER: char = '!';

static MENTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("{}(?P<code>{})", MENTION_MARKER, *CODE_PATTERN))
        .expect("valid mention regex")
});

static BARE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("(?P<code>{})", *CODE_PATTERN)).expect("valid code regex"));

/// Extracts codes from free text.
#[derive(Debug, Clone)]
pub struct CodeMatcher {
    regex: &'static Regex,
    limit: usize,
}

impl CodeMatcher {
    /// Codes written as `!CODE` in chat messages.
    pub fn mentions() -> Self {
        Self {
            regex: &MENTION_RE,
            limit: MODULES_COUNT_LIMIT,
        }
    }

    /// Any code-shaped token; used for explicit commands where the user
    /// already asked for a lookup.
    pub fn bare() -> Self {
        Self {
            regex: &BARE_RE,
            limit: MODULES_COUNT_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Matches in message order, capped at the limit. Duplicates are kept.
    pub fn find(&self, text: &str) -> Vec<Code> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| caps.name("code"))
            .filter_map(|m| Code::parse(m.as_str()).ok())
            .take(self.limit)
            .collect()
    }

    /// Matches in first-seen order with duplicates removed.
    pub fn find_unique(&self, text: &str) -> Vec<Code> {
        dedup_codes(self.find(text))
    }
}

impl Default for CodeMatcher {
    fn default() -> Self {
        Self::mentions()
    }
}

pub fn dedup_codes(codes: Vec<Code>) -> Vec<Code> {
    let mut seen = HashSet::new();
    codes
        .into_iter()
        .filter(|code| seen.insert(code.clone()))
        .collect()
}
