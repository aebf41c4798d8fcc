// Field-level extraction strategies.
//
// Each field has an ordered chain of strategies; the first one that yields a
// value wins. Nothing here fails: a field that no strategy finds resolves to
// `None` and the extractor substitutes its default.

use std::collections::HashSet;

use tracing::debug;
use url::Url;

use crate::surface::{Node, Scope, Surface};

pub const DEFAULT_AUTHOR: &str = "未找到作者";
pub const UNTITLED: &str = "无标题";
pub const EXCERPT_PREFIX: &str = "[摘] ";
pub const EXCERPT_SUFFIX: &str = "...";
const EXCERPT_CHARS: usize = 20;

pub const TAG_SELECTOR: &str = "a.tag";
pub const LIKES_SELECTOR: &str = ".like-wrapper .count";
pub const COLLECTS_SELECTOR: &str = ".collect-wrapper .count";
pub const COMMENTS_SELECTOR: &str = ".chat-wrapper .count";

/// Gallery, slider and swiper variants of the image carousel.
pub const IMAGE_SELECTORS: &[&str] = &[".media-container img", ".note-slider img", ".swiper-slide img"];
/// Avatars and placeholder sprites that share the carousel markup.
const IMAGE_EXCLUDES: &[&str] = &["avatar", "spectrum"];
/// Page-level fallbacks, queried outside the note container.
const META_IMAGE_SELECTORS: &[&str] = &[r#"meta[name="og:image"]"#, r#"meta[property="og:image"]"#];

/// One way of pulling a text value out of the note container.
#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    /// Trimmed text of the first node matching the selector.
    FirstText(&'static str),
    /// Trimmed text of the first matching node whose text contains any needle
    /// (case-insensitive).
    TextContaining {
        selector: &'static str,
        needles: &'static [&'static str],
    },
}

impl Strategy {
    pub fn apply(&self, scope: &Scope<'_>) -> Option<String> {
        match *self {
            Strategy::FirstText(selector) => scope.query(selector).map(|n| n.text().trim().to_string()),
            Strategy::TextContaining { selector, needles } => scope
                .query_all(&[selector])
                .into_iter()
                .map(|n| n.text().trim().to_string())
                .find(|text| {
                    let lower = text.to_lowercase();
                    needles.iter().any(|needle| lower.contains(needle))
                }),
        }
    }
}

/// Ordered strategies for one field.
#[derive(Debug, Clone, Copy)]
pub struct Chain {
    pub field: &'static str,
    pub strategies: &'static [Strategy],
    /// Whether a matched-but-blank value stops the chain.
    pub accept_blank: bool,
}

impl Chain {
    pub fn resolve(&self, scope: &Scope<'_>) -> Option<String> {
        let found = self.strategies.iter().enumerate().find_map(|(idx, strategy)| {
            let value = strategy.apply(scope)?;
            if value.is_empty() && !self.accept_blank {
                return None;
            }
            Some((idx, value))
        });

        match found {
            Some((idx, value)) => {
                debug!(field = self.field, strategy = idx, "Field resolved");
                Some(value)
            }
            None => {
                debug!(field = self.field, "Field degraded to default");
                None
            }
        }
    }
}

pub const AUTHOR: Chain = Chain {
    field: "author",
    strategies: &[
        Strategy::FirstText("span.username"),
        Strategy::FirstText(".author-wrapper .name"),
    ],
    accept_blank: true,
};

pub const TITLE: Chain = Chain {
    field: "title",
    strategies: &[Strategy::FirstText(".title"), Strategy::FirstText("#title")],
    accept_blank: true,
};

pub const BODY: Chain = Chain {
    field: "body",
    strategies: &[Strategy::FirstText(".desc"), Strategy::FirstText(".note-text")],
    accept_blank: true,
};

/// The date line moved between page revisions; the last resort scans the
/// interaction bar for anything that looks like a date.
pub const RAW_DATE: Chain = Chain {
    field: "date",
    strategies: &[
        Strategy::FirstText(".date"),
        Strategy::FirstText(".bottom-container"),
        Strategy::TextContaining {
            selector: ".interaction-container span",
            needles: &["202", "天前", "小时前", "分钟前", "昨天", "ago", "yesterday"],
        },
    ],
    accept_blank: false,
};

/// Title as shown, else an excerpt of the body, else a placeholder.
pub fn synthesize_title(title: String, body: &str) -> String {
    if !title.is_empty() {
        return title;
    }
    if body.is_empty() {
        return UNTITLED.to_string();
    }
    let excerpt: String = body
        .chars()
        .take(EXCERPT_CHARS)
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect();
    format!("{EXCERPT_PREFIX}{excerpt}{EXCERPT_SUFFIX}")
}

pub fn tags(scope: &Scope<'_>) -> Vec<String> {
    scope
        .query_all(&[TAG_SELECTOR])
        .iter()
        .map(|n| n.text().trim().to_string())
        .collect()
}

/// Carousel image URLs, or the page's og:image when the carousel is empty.
/// Relative URLs are resolved against the page URL. Duplicates are dropped,
/// keeping first-seen order.
pub fn images(scope: &Scope<'_>) -> Vec<String> {
    let surface = scope.surface();
    let base = Url::parse(surface.url()).ok();

    let mut urls: Vec<String> = scope
        .query_all(IMAGE_SELECTORS)
        .iter()
        .filter_map(|n| n.attr("src"))
        .filter(|src| !src.trim().is_empty())
        .filter(|src| !IMAGE_EXCLUDES.iter().any(|marker| src.contains(marker)))
        .map(|src| absolutize(base.as_ref(), src.trim()))
        .collect();

    if urls.is_empty() {
        debug!("No carousel images, falling back to og:image");
        urls = META_IMAGE_SELECTORS
            .iter()
            .filter_map(|selector| surface.query(selector))
            .filter_map(|n| meta_content(&n))
            .take(1)
            .map(|content| absolutize(base.as_ref(), &content))
            .collect();
    }

    dedup_in_order(urls)
}

fn meta_content(node: &Node) -> Option<String> {
    node.attr("content")
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

fn absolutize(base: Option<&Url>, src: &str) -> String {
    match base.and_then(|b| b.join(src).ok()) {
        Some(resolved) => resolved.to_string(),
        None => src.to_string(),
    }
}

pub fn dedup_in_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}

/// Engagement counter under `selector`; 0 when missing or not numeric.
pub fn counter(scope: &Scope<'_>, selector: &str) -> u64 {
    scope
        .query(selector)
        .map(|n| leading_integer(n.text()))
        .unwrap_or(0)
}

/// Leading decimal integer of the trimmed text ("1.2万" → 1, "10+" → 10,
/// "赞" → 0). Negative or overflowing values count as 0.
pub fn leading_integer(text: &str) -> u64 {
    let trimmed = text.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = unsigned.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}
