use std::collections::BTreeMap;

/// A matched element: its text content and attributes, detached from the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    text: String,
    attributes: BTreeMap<String, String>,
}

impl Node {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Concatenated text of the element and its descendants, untrimmed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Read-only, selector-queryable view of a rendered page.
///
/// Implementations must not mutate the underlying document. An invalid
/// selector behaves like a selector with no matches.
pub trait Surface {
    /// URL the page was rendered from.
    fn url(&self) -> &str;

    /// All matches in document order.
    fn query_all(&self, selector: &str) -> Vec<Node>;

    /// First match in document order.
    fn query(&self, selector: &str) -> Option<Node> {
        self.query_all(selector).into_iter().next()
    }
}

/// Queries restricted to descendants of a root element.
pub struct Scope<'a> {
    surface: &'a dyn Surface,
    root: &'a str,
}

impl<'a> Scope<'a> {
    pub fn new(surface: &'a dyn Surface, root: &'a str) -> Self {
        Self { surface, root }
    }

    pub fn surface(&self) -> &'a dyn Surface {
        self.surface
    }

    pub fn query(&self, selector: &str) -> Option<Node> {
        self.surface.query(&self.scoped(&[selector]))
    }

    /// Matches of any of `selectors`, merged in document order.
    pub fn query_all(&self, selectors: &[&str]) -> Vec<Node> {
        if selectors.is_empty() {
            return Vec::new();
        }
        self.surface.query_all(&self.scoped(selectors))
    }

    fn scoped(&self, selectors: &[&str]) -> String {
        selectors
            .iter()
            .map(|selector| format!("{} {}", self.root, selector))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
