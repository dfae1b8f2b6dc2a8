use crate::{ResolverError, Result};
use oumodules_protocol::{Code, CodeKind};

const SHORT_COURSE_PATH: &str = "/courses/short-courses/";
const POSTGRADUATE_MODULE_PATH: &str = "/postgraduate/modules/";
const QUALIFICATION_DETAILS_PATH: &str = "/courses/qualifications/details/";
const MODULE_PATH: &str = "/courses/modules/";
const POSTGRADUATE_QUALIFICATION_PATH: &str = "/postgraduate/qualifications/";
const QUALIFICATION_PATH: &str = "/courses/qualifications/";

/// Study level of a module: the first digit anywhere in the code.
pub fn level_of(code: &str) -> Result<u8> {
    code.bytes()
        .find(u8::is_ascii_digit)
        .map(|digit| digit - b'0')
        .ok_or_else(|| ResolverError::InvalidCode(format!("{code} has no level digit")))
}

/// Builds the canonical page URLs a code may live at.
#[derive(Debug, Clone)]
pub struct UrlTemplates {
    base: String,
}

impl UrlTemplates {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Candidates in the order they should be probed.
    pub fn candidates(&self, code: &Code) -> Result<Vec<String>> {
        let paths: &[&str] = match code.kind() {
            CodeKind::Qualification => &[POSTGRADUATE_QUALIFICATION_PATH, QUALIFICATION_PATH],
            CodeKind::Module => match level_of(code.as_str())? {
                0 => &[SHORT_COURSE_PATH],
                8 => &[POSTGRADUATE_MODULE_PATH],
                _ => &[QUALIFICATION_DETAILS_PATH, MODULE_PATH],
            },
        };
        let slug = code.slug();
        Ok(paths
            .iter()
            .map(|path| format!("{}{path}{slug}", self.base))
            .collect())
    }
}
