use bitable_client::Fields;
use notesync_common::{Annotations, ExtractedRecord};
use serde_json::{json, Value};

pub const URL: &str = "url";
pub const PUBLISHED_AT: &str = "发布日期";
pub const IMAGES: &str = "图片链接";
pub const TITLE: &str = "标题";
pub const AUTHOR: &str = "作者";
pub const BODY: &str = "正文";
pub const TAGS: &str = "标签";
pub const LIKES: &str = "点赞";
pub const COLLECTS: &str = "收藏";
pub const COMMENTS: &str = "评论";
pub const NOTE: &str = "批注";
pub const KEYWORDS: &str = "关键词";

/// Column payload for one note. The natural key goes under `key_field`;
/// images are newline-joined into a single text cell.
pub fn to_fields(record: &ExtractedRecord, annotations: &Annotations, key_field: &str) -> Fields {
    let columns: [(&str, Value); 13] = [
        (key_field, json!(record.id)),
        (URL, json!(record.source_url)),
        (PUBLISHED_AT, json!(record.timestamp)),
        (IMAGES, json!(record.images.join("\n"))),
        (TITLE, json!(record.title)),
        (AUTHOR, json!(record.author)),
        (BODY, json!(record.body)),
        (TAGS, json!(record.tags)),
        (LIKES, json!(record.likes)),
        (COLLECTS, json!(record.collects)),
        (COMMENTS, json!(record.comments)),
        (NOTE, json!(annotations.note.trim())),
        (KEYWORDS, json!(annotations.keywords.trim())),
    ];

    columns
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}
