use chrono::{DateTime, Local};
use notesync_common::{ExtractedRecord, ExtractionError};
use tracing::{info, warn};

use crate::fields::{self, COLLECTS_SELECTOR, COMMENTS_SELECTOR, LIKES_SELECTOR};
use crate::note_id::derive_note_id;
use crate::surface::{Scope, Surface};
use crate::timestamp::normalize_timestamp;

/// Container every note page renders its content into.
pub const ROOT_SELECTOR: &str = "#noteContainer";

/// Extract a note from the page, resolving relative dates against the
/// current local time.
pub fn extract(surface: &dyn Surface) -> Result<ExtractedRecord, ExtractionError> {
    extract_at(surface, Local::now())
}

/// Extract a note from the page as of `now`.
///
/// Fails only when the page has no note container. Every missing field
/// degrades to its default.
pub fn extract_at(
    surface: &dyn Surface,
    now: DateTime<Local>,
) -> Result<ExtractedRecord, ExtractionError> {
    let url = surface.url();
    if surface.query(ROOT_SELECTOR).is_none() {
        return Err(ExtractionError::NotASupportedPage {
            url: url.to_string(),
        });
    }
    let scope = Scope::new(surface, ROOT_SELECTOR);

    let id = derive_note_id(url, now.timestamp_millis());

    let author = fields::AUTHOR
        .resolve(&scope)
        .unwrap_or_else(|| fields::DEFAULT_AUTHOR.to_string());
    let body = fields::BODY.resolve(&scope).unwrap_or_default();
    let title = fields::synthesize_title(fields::TITLE.resolve(&scope).unwrap_or_default(), &body);
    let raw_date = fields::RAW_DATE.resolve(&scope).unwrap_or_default();

    let record = ExtractedRecord {
        id,
        source_url: url.to_string(),
        author,
        title,
        body,
        tags: fields::tags(&scope),
        timestamp: normalize_timestamp(&raw_date, now.naive_local()),
        images: fields::images(&scope),
        likes: fields::counter(&scope, LIKES_SELECTOR),
        collects: fields::counter(&scope, COLLECTS_SELECTOR),
        comments: fields::counter(&scope, COMMENTS_SELECTOR),
    };

    if !record.has_stable_id() {
        warn!(
            note_id = %record.id,
            url,
            "No note id in URL, using a synthetic id; this note cannot be deduplicated later"
        );
    }

    info!(
        note_id = %record.id,
        title = %record.title,
        images = record.images.len(),
        tags = record.tags.len(),
        "Extracted note"
    );

    Ok(record)
}
