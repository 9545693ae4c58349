//! Detection of console pages that stand in for the counter report when it
//! cannot be served (expired session, changed credentials, missing page).

/// Phrases the console prints instead of the report. Matched as plain
/// substrings of the raw document.
pub const UNAVAILABLE_MARKERS: &[&str] = &[
    "Remote UI : Cannot open this page.",
    "Cannot display the specified page.",
    "authentication information has been updated",
    "session has expired",
];

/// Returns true if `html` is one of the console's "cannot open" pages.
pub fn is_unavailable(html: &str) -> bool {
    unavailable_marker(html).is_some()
}

/// The first marker found in `html`, for diagnostics.
pub fn unavailable_marker(html: &str) -> Option<&'static str> {
    UNAVAILABLE_MARKERS
        .iter()
        .copied()
        .find(|marker| html.contains(marker))
}
