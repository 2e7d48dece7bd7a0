//! Matched document nodes and the built-in value extractors
//!
//! A [`Node`] is a borrowed element of a parsed `scraper::Html` tree together
//! with the base URL of its document, so attribute values can be resolved to
//! absolute links.

use std::fmt;
use std::str::FromStr;

use scraper::{ElementRef, Selector};
use url::Url;

/// An element matched by a selector
#[derive(Clone, Copy)]
pub struct Node<'a> {
    element: ElementRef<'a>,
    base: Option<&'a Url>,
}

impl<'a> Node<'a> {
    pub fn new(element: ElementRef<'a>, base: Option<&'a Url>) -> Self {
        Self { element, base }
    }

    pub fn element(&self) -> ElementRef<'a> {
        self.element
    }

    pub fn base_url(&self) -> Option<&'a Url> {
        self.base
    }

    /// Lowercase tag name
    pub fn name(&self) -> &'a str {
        self.element.value().name()
    }

    /// Text of this element and all descendants, whitespace-normalized
    pub fn text(&self) -> String {
        normalize_whitespace(&self.element.text().collect::<String>())
    }

    /// Text of the direct text children only
    pub fn own_text(&self) -> String {
        let own: String = self
            .element
            .children()
            .filter_map(|child| child.value().as_text().map(|t| &**t))
            .collect();
        normalize_whitespace(&own)
    }

    /// Outer HTML
    pub fn html(&self) -> String {
        self.element.html()
    }

    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Attribute value resolved against the document base URL.
    ///
    /// Absolute values are returned as-is (normalized); relative values need
    /// a base URL, otherwise `None`.
    pub fn abs_url(&self, name: &str) -> Option<String> {
        let raw = self.attr(name)?.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(absolute) = Url::parse(raw) {
            return Some(absolute.to_string());
        }
        self.base?.join(raw).ok().map(|u| u.to_string())
    }

    /// This element, if it matches, followed by the matching descendants in
    /// document order
    pub fn select<'s>(&self, selector: &'s Selector) -> impl Iterator<Item = Node<'a>> + 's
    where
        'a: 's,
    {
        let base = self.base;
        let own = selector.matches(&self.element).then_some(self.element);
        own.into_iter()
            .chain(self.element.select(selector))
            .map(move |element| Node::new(element, base))
    }

    pub fn select_first(&self, selector: &Selector) -> Option<Node<'a>> {
        self.select(selector).next()
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name())
            .field("base", &self.base.map(Url::as_str))
            .finish()
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Which part of a node a scalar converter reads
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Extract {
    /// Normalized text of the element and its descendants
    #[default]
    Text,
    OwnText,
    Html,
    InnerHtml,
    /// Attribute value, empty when missing
    Attr(String),
    /// Attribute value resolved to an absolute URL, empty when unresolvable
    AbsUrl(String),
}

impl Extract {
    pub fn attr(name: impl Into<String>) -> Self {
        Self::Attr(name.into())
    }

    pub fn abs_url(name: impl Into<String>) -> Self {
        Self::AbsUrl(name.into())
    }

    pub fn apply(&self, node: &Node<'_>) -> String {
        match self {
            Self::Text => node.text(),
            Self::OwnText => node.own_text(),
            Self::Html => node.html(),
            Self::InnerHtml => node.inner_html(),
            Self::Attr(name) => node.attr(name).unwrap_or_default().to_string(),
            Self::AbsUrl(name) => node.abs_url(name).unwrap_or_default(),
        }
    }
}

/// Accessor syntax: `text`, `own_text`, `html`, `inner_html`, `attr:<name>`,
/// `abs:<name>`. `innerText` and `innerHTML` are accepted as aliases.
impl FromStr for Extract {
    type Err = String;

    fn from_str(accessor: &str) -> Result<Self, Self::Err> {
        let accessor = accessor.trim();
        if let Some(name) = accessor.strip_prefix("attr:") {
            return non_empty(name, accessor).map(Self::attr);
        }
        if let Some(name) = accessor.strip_prefix("abs:") {
            return non_empty(name, accessor).map(Self::abs_url);
        }
        match accessor {
            "" | "text" | "innerText" => Ok(Self::Text),
            "own_text" => Ok(Self::OwnText),
            "html" => Ok(Self::Html),
            "inner_html" | "innerHTML" => Ok(Self::InnerHtml),
            other => Err(other.to_string()),
        }
    }
}

fn non_empty<'s>(name: &'s str, accessor: &str) -> Result<&'s str, String> {
    let name = name.trim();
    if name.is_empty() {
        Err(accessor.to_string())
    } else {
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first<'a>(document: &'a Html, css: &str, base: Option<&'a Url>) -> Node<'a> {
        let selector = Selector::parse(css).unwrap();
        Node::new(document.root_element(), base)
            .select_first(&selector)
            .unwrap()
    }

    #[test]
    fn test_text_accessors() {
        let html = r#"
        <div class="card">
            Outer
            <span>  inner
                text </span>
            tail
        </div>
        "#;
        let document = Html::parse_document(html);
        let card = first(&document, ".card", None);

        assert_eq!(card.text(), "Outer inner text tail");
        assert_eq!(card.own_text(), "Outer tail");
        assert_eq!(card.name(), "div");
        assert!(card.inner_html().contains("<span>"));
        assert!(card.html().starts_with("<div class=\"card\">"));
    }

    #[test]
    fn test_abs_url_resolution() {
        let html = r#"
        <a class="rel" href="/product/123">Product</a>
        <a class="abs" href="https://other.example/x">Other</a>
        <a class="none">No link</a>
        "#;
        let document = Html::parse_document(html);
        let base = Url::parse("https://shop.example/catalog/").unwrap();

        let rel = first(&document, "a.rel", Some(&base));
        assert_eq!(
            rel.abs_url("href").as_deref(),
            Some("https://shop.example/product/123")
        );

        let abs = first(&document, "a.abs", None);
        assert_eq!(abs.abs_url("href").as_deref(), Some("https://other.example/x"));

        // relative link without a base
        let rel_no_base = first(&document, "a.rel", None);
        assert_eq!(rel_no_base.abs_url("href"), None);

        let none = first(&document, "a.none", Some(&base));
        assert_eq!(none.abs_url("href"), None);
        assert_eq!(Extract::abs_url("href").apply(&none), "");
    }

    #[test]
    fn test_extract_from_str() {
        assert_eq!("text".parse::<Extract>(), Ok(Extract::Text));
        assert_eq!("innerHTML".parse::<Extract>(), Ok(Extract::InnerHtml));
        assert_eq!("attr:href".parse::<Extract>(), Ok(Extract::attr("href")));
        assert_eq!("abs:src".parse::<Extract>(), Ok(Extract::abs_url("src")));
        assert_eq!("attr:".parse::<Extract>(), Err("attr:".to_string()));
        assert_eq!("children.0".parse::<Extract>(), Err("children.0".to_string()));
    }

    #[test]
    fn test_select_includes_starting_element() {
        let document = Html::parse_document(
            r#"<html lang="en"><body><div class="card"><div class="card">inner</div></div></body></html>"#,
        );
        let root = Node::new(document.root_element(), None);

        let html = Selector::parse("html").unwrap();
        assert_eq!(root.select_first(&html).and_then(|n| n.attr("lang")), Some("en"));

        let cards = Selector::parse(".card").unwrap();
        let outer = root.select_first(&cards).unwrap();
        assert_eq!(outer.select(&cards).count(), 2);
        assert_eq!(
            outer.select_first(&cards).map(|n| n.html()),
            Some(outer.html())
        );
    }

    #[test]
    fn test_missing_attr_is_empty() {
        let document = Html::parse_document(r#"<span class="price">$5</span>"#);
        let price = first(&document, ".price", None);

        assert_eq!(Extract::attr("data-id").apply(&price), "");
        assert_eq!(Extract::Text.apply(&price), "$5");
    }
}
