use once_cell::sync::Lazy;
use regex::Regex;

const DETAILS_MARKER: &str = "archive.org/details/";

/// Compile the details-link regex once
static DETAILS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"archive\.org/details/([^/?#\s]+)").expect("Failed to compile details regex")
});

/// Extracts the item identifier from an archive details URL.
/// Absence is signalled with `None`, never an error, so callers can branch
/// into a user-facing hint.
pub fn extract(text: &str) -> Option<String> {
    DETAILS_REGEX
        .captures(text)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_owned()))
}

pub fn is_archive_link(text: &str) -> bool {
    text.contains(DETAILS_MARKER)
}

pub fn details_url(identifier: &str) -> String {
    format!("https://archive.org/details/{identifier}")
}
