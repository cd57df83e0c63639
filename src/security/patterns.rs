//! Suspicious-input denylist.
//!
//! Advisory screening of request paths and query strings. It catches the
//! obvious attack strings and nothing more; handlers still bind parameters and
//! encode output.

use std::sync::LazyLock;

use regex::Regex;

const SUSPICIOUS_PATTERNS: &[&str] = &[
    // path traversal
    r"\.\./",
    r"\.\.\\",
    r"(?i)%2e%2e(%2f|%5c|/|\\)",
    // script injection
    r"(?i)<\s*script",
    r"(?i)javascript\s*:",
    r"(?i)vbscript\s*:",
    r"(?i)\bon(load|error|click|mouseover|focus)\s*=",
    // SQL shapes
    r"(?i)\bunion\b.+\bselect\b",
    r"(?i)\bselect\b.+\bfrom\b",
    r"(?i)\binsert\s+into\b",
    r"(?i)\bdelete\s+from\b",
    r"(?i)\bdrop\s+(table|database)\b",
    r"(?i)\bupdate\b.+\bset\b",
    r"(?i)'\s*or\s*'?\d+'?\s*=\s*'?\d+",
    r"(?i)'\s*;?\s*--",
    // null byte
    r"%00",
    "\u{0}",
];

static DENYLIST: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SUSPICIOUS_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("invalid suspicious input pattern"))
        .collect()
});

/// Returns true when `input` matches any denylist pattern.
pub fn is_suspicious(input: &str) -> bool {
    DENYLIST.iter().any(|re| re.is_match(input))
}

/// Screen a request target: the raw path and query, plus each
/// percent-decoded query key and value.
pub fn is_suspicious_target(path: &str, query: Option<&str>) -> bool {
    if is_suspicious(path) {
        return true;
    }
    let Some(query) = query else {
        return false;
    };
    if is_suspicious(query) {
        return true;
    }
    url::form_urlencoded::parse(query.as_bytes())
        .any(|(k, v)| is_suspicious(&k) || is_suspicious(&v))
}
