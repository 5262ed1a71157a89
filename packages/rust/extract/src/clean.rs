//! Cell text cleanup.
//!
//! Table extractors keep the line breaks of wrapped cells; every value that
//! reaches a record is flattened to one line first.

use std::sync::LazyLock;

use regex::Regex;

/// Masking character the portal sprinkles over consignee addresses.
pub(crate) const DECORATIVE_CHAR: char = '*';

/// Replace each embedded line break with a single space.
fn collapse_newlines(text: &str) -> String {
    static NEWLINE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\r\n|\r|\n").expect("valid regex"));

    NEWLINE_RE.replace_all(text, " ").into_owned()
}

/// Clean a value cell: collapse newlines and trim. A missing cell is empty.
pub fn clean_value(raw: Option<&str>) -> String {
    match raw {
        Some(text) => collapse_newlines(text).trim().to_string(),
        None => String::new(),
    }
}

/// Clean an address fragment: collapse newlines, drop the masking
/// character, trim.
pub fn clean_fragment(raw: &str) -> String {
    collapse_newlines(raw)
        .replace(DECORATIVE_CHAR, "")
        .trim()
        .to_string()
}

/// Normalize a label cell for pattern matching: flatten wrapped lines, trim
/// and lowercase.
pub fn normalize_label(raw: &str) -> String {
    collapse_newlines(raw).trim().to_lowercase()
}

/// Keep only the first whitespace-delimited token (drops a time component).
pub fn date_token(value: &str) -> &str {
    value.split_whitespace().next().unwrap_or("")
}
