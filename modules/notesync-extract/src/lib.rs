//! Structured extraction of Xiaohongshu note pages.
//!
//! `extract()` turns a read-only [`Surface`] (a rendered page snapshot) into an
//! [`ExtractedRecord`]. Only a missing `#noteContainer` fails the extraction;
//! every other missing field degrades to a default.

pub mod extractor;
pub mod fields;
pub mod html;
pub mod note_id;
pub mod surface;
pub mod timestamp;

pub use extractor::{extract, extract_at, ROOT_SELECTOR};
pub use html::HtmlSurface;
pub use note_id::derive_note_id;
pub use notesync_common::{ExtractedRecord, ExtractionError};
pub use surface::{Node, Scope, Surface};
pub use timestamp::normalize_timestamp;
