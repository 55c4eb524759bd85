//! Content safety filter for collected snippets.
//!
//! A regex deny-list over snippet text, matched case-insensitively anywhere
//! in the input. [`scan`] reports which pattern matched; [`is_safe`] wraps it
//! with a warning log including a truncated preview.
//!
//! This is a crude textual heuristic, not a sandbox: it produces false
//! positives (prose that happens to contain `eval (`) and false negatives
//! (obfuscated payloads). It exists to keep the obviously destructive
//! one-liners out of the feed, nothing more.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Characters of rejected content included in the warning log.
const PREVIEW_CHARS: usize = 50;

/// `(label, pattern)` pairs. Labels show up in logs and rejection reasons.
const DENY_SPECS: &[(&str, &str)] = &[
    ("recursive filesystem delete", r"rm\s+-rf"),
    ("dynamic exec call", r"exec\s*\("),
    ("dynamic eval call", r"eval\s*\("),
    ("shell escape via os.system", r"os\.system\s*\("),
    ("subprocess invocation", r"subprocess\."),
    ("piped remote shell install", r"curl\s[^|]*\|\s*(?:ba)?sh\b"),
    ("windows recursive delete", r"del\s+/s\s+/q"),
];

struct DenyPattern {
    label: &'static str,
    regex: Regex,
}

/// Deny-list compiled once on first use.
static DENY_LIST: LazyLock<Vec<DenyPattern>> = LazyLock::new(|| {
    DENY_SPECS
        .iter()
        .map(|(label, pattern)| DenyPattern {
            label,
            regex: RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("deny-list regex"),
        })
        .collect()
});

/// Scan `text` against the deny-list. Returns the label of the first
/// matching pattern, or `None` when the text is clean.
pub fn scan(text: &str) -> Option<&'static str> {
    DENY_LIST
        .iter()
        .find(|entry| entry.regex.is_match(text))
        .map(|entry| entry.label)
}

/// Whether `text` passes the deny-list. Rejections are logged with the
/// matched pattern label and a truncated preview of the content.
pub fn is_safe(text: &str) -> bool {
    match scan(text) {
        Some(label) => {
            let preview: String = text.chars().take(PREVIEW_CHARS).collect();
            warn!(pattern = label, "potentially dangerous content rejected: {preview}...");
            false
        }
        None => true,
    }
}
