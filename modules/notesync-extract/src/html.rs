use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::surface::{Node, Surface};

/// [`Surface`] over a parsed HTML snapshot of a rendered page.
pub struct HtmlSurface {
    url: String,
    document: Html,
}

impl HtmlSurface {
    pub fn parse(url: &str, html: &str) -> Self {
        Self {
            url: url.to_string(),
            document: Html::parse_document(html),
        }
    }
}

impl Surface for HtmlSurface {
    fn url(&self) -> &str {
        &self.url
    }

    fn query_all(&self, selector: &str) -> Vec<Node> {
        match parse_selector(selector) {
            Some(parsed) => self.document.select(&parsed).map(to_node).collect(),
            None => Vec::new(),
        }
    }

    fn query(&self, selector: &str) -> Option<Node> {
        let parsed = parse_selector(selector)?;
        self.document.select(&parsed).next().map(to_node)
    }
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            debug!(selector, error = %err, "Ignoring invalid selector");
            None
        }
    }
}

fn to_node(element: ElementRef<'_>) -> Node {
    let text = element.text().collect::<String>();
    element
        .value()
        .attrs()
        .fold(Node::new(text), |node, (name, value)| node.with_attr(name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><meta name="og:image" content="https://cdn/og.jpg"></head>
        <body><div id="noteContainer">
            <span class="username"> Alice </span>
            <div class="desc">line one<br>line <b>two</b></div>
        </div></body></html>"#;

    #[test]
    fn text_includes_descendants() {
        let surface = HtmlSurface::parse("https://example.com", PAGE);
        let desc = surface.query("#noteContainer .desc").unwrap();
        assert_eq!(desc.text(), "line oneline two");
    }

    #[test]
    fn attributes_are_exposed() {
        let surface = HtmlSurface::parse("https://example.com", PAGE);
        let meta = surface.query(r#"meta[name="og:image"]"#).unwrap();
        assert_eq!(meta.attr("content"), Some("https://cdn/og.jpg"));
    }

    #[test]
    fn invalid_selector_matches_nothing() {
        let surface = HtmlSurface::parse("https://example.com", PAGE);
        assert!(surface.query("span[[").is_none());
        assert!(surface.query_all("div[").is_empty());
    }
}
