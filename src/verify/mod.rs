//! Verification link locator.
//!
//! A heuristic, not a validator: any `http(s)` URL whose run of characters
//! contains `verify`, `confirm` or `activate` qualifies. URLs are not
//! resolved, checked against URI grammar, or matched to known providers.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::part::Part;
use crate::parser::content::extract_content;

/// Scheme, then a run of characters other than whitespace, `<`, `>`, `"`
/// or `'` that contains one of the keywords.
static VERIFY_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s<>"']*(?:verify|confirm|activate)[^\s<>"']*"#)
        .expect("verification URL pattern is valid")
});

/// Return the left-most verification-looking URL in `text`.
pub fn find_verify_url(text: &str) -> Option<&str> {
    VERIFY_URL.find(text).map(|m| m.as_str())
}

/// Locate a verification URL in a message payload.
///
/// Searches the plain-text body if present, otherwise the HTML body.
pub fn extract_verify_url(payload: Option<&Part>) -> Option<String> {
    let content = extract_content(payload);
    find_verify_url(content.search_text()).map(str::to_string)
}
