//! Canonical forms for links and titles.
//!
//! Both functions are pure: the same input always yields the same output.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Runs of two or more spaces.
static MULTI_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("valid regex"));

/// Strip every query parameter whose name is not in `allowed`.
///
/// Kept parameters are re-encoded sorted by name, so the result is stable and
/// normalizing twice is a no-op. Input that does not parse as a URL is
/// returned unchanged.
pub fn normalize_link(raw: &str, allowed: &[String]) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    let mut kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| allowed.iter().any(|a| a == key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    kept.sort_by(|a, b| a.0.cmp(&b.0));

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&kept);
    }

    url.to_string()
}

/// Decode HTML entities, drop non-printable characters, collapse repeated
/// spaces and trim. Empty input yields an empty string.
pub fn normalize_title(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);

    let printable: String = decoded
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some(' ')
            } else if c.is_control() || is_invisible(c) {
                None
            } else {
                Some(c)
            }
        })
        .collect();

    MULTI_SPACE_RE.replace_all(&printable, " ").trim().to_string()
}

/// Zero-width and formatting code points that render as nothing.
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}' | '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}' | '\u{FEFF}'
    )
}
