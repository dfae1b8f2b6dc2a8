//! Title extraction from course pages and digital archive pages.

use once_cell::sync::Lazy;
use oumodules_protocol::{CODE_PATTERN, MODULE_CODE_PATTERN};
use regex::Regex;

const TITLE_SEPARATOR: &str = r"[^\s]";
const MAX_MODULE_NAME_LEN: usize = 100;

static MODULE_NAME_PATTERN: Lazy<String> =
    Lazy::new(|| format!(r"[A-Z][a-zA-Z0-9,.:;\(\) \-]{{1,{MAX_MODULE_NAME_LEN}}}?"));

// Page titles come in two orderings: `CODE | Name | Open University` and
// `Name | Open University | CODE`. The trailing `.*` admits ` Course`.
static HTML_TITLE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    let code = &*CODE_PATTERN;
    let name = &*MODULE_NAME_PATTERN;
    let sep = TITLE_SEPARATOR;
    let templates = [
        format!(
            r"{code}\s*{sep}\s*(?P<name>{name})\s*({sep}\s*Open University.*)?"
        ),
        format!(
            r"(?P<name>{name})\s*({sep}\s*Open University.*)?\s*{sep}\s{code}"
        ),
    ];
    templates
        .iter()
        .map(|t| Regex::new(&format!(r"<title>\s*(?:{t})\s*</title>")).expect("valid title regex"))
        .collect()
});

static ARCHIVE_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"<title>{MODULE_CODE_PATTERN} (.*?) - Open University Digital Archive</title>"
    ))
    .expect("valid archive title regex")
});

/// Name from a course page `<title>`, trying both orderings.
pub fn find_title_in_html(html: &str) -> Option<String> {
    HTML_TITLE_RES.iter().find_map(|re| {
        re.captures(html)
            .and_then(|caps| caps.name("name"))
            .map(|m| m.as_str().to_string())
    })
}

/// Name from a digital archive `<title>`.
pub fn find_archive_title(html: &str) -> Option<String> {
    ARCHIVE_TITLE_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|title| !title.is_empty())
}
