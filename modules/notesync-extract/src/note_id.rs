use std::sync::LazyLock;

use notesync_common::SYNTHETIC_ID_PREFIX;
use regex::Regex;

static EXPLORE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/explore/([a-fA-F0-9]{24})").unwrap());

static HEX_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-fA-F0-9]{24}$").unwrap());

/// Note id carried by the URL itself, if any.
///
/// Tries `/explore/<id>` first, then any path segment (query string
/// stripped) that is exactly 24 hex characters.
pub fn structural_note_id(url: &str) -> Option<String> {
    if let Some(caps) = EXPLORE_PATH.captures(url) {
        return Some(caps[1].to_string());
    }

    url.split('/')
        .map(|segment| segment.split('?').next().unwrap_or(segment))
        .find(|segment| HEX_ID.is_match(segment))
        .map(str::to_string)
}

/// Natural key for a note page. Falls back to `unknown_<captured_at_millis>`,
/// which is never stable across runs.
pub fn derive_note_id(url: &str, captured_at_millis: i64) -> String {
    structural_note_id(url)
        .unwrap_or_else(|| format!("{SYNTHETIC_ID_PREFIX}{captured_at_millis}"))
}
