//! The extraction plan for one result type
//!
//! A [`Parser`] pairs an instance generator with an ordered list of
//! converters. Parsing creates one instance and runs every converter against
//! the root node exactly once, in registration order.

use std::fmt;
use std::io::Read;

use scraper::Html;
use tracing::debug;
use url::Url;

use crate::builder::ParserBuilder;
use crate::converter::Converter;
use crate::document::{encoding_for, Document};
use crate::error::Result;
use crate::node::Node;
use crate::options::ParseOptions;

pub(crate) type Generator<V> = Box<dyn Fn() -> V + Send + Sync>;

pub struct Parser<V> {
    generator: Generator<V>,
    converters: Vec<Converter<V>>,
    options: ParseOptions,
}

impl<V: 'static> Parser<V> {
    pub fn builder() -> ParserBuilder<V> {
        ParserBuilder::new()
    }

    /// Build a parser from a generator and a configuration closure.
    ///
    /// ```
    /// use soup_parser::Parser;
    ///
    /// #[derive(Default)]
    /// struct Profile {
    ///     name: String,
    ///     followers: i32,
    /// }
    ///
    /// let parser = Parser::new(Profile::default, |p| {
    ///     p.text_into(".p-name", |v: &mut Profile| &mut v.name);
    ///     p.int_into(".followers", |v: &mut Profile| &mut v.followers);
    /// })
    /// .unwrap();
    ///
    /// let profile = parser.parse_str(
    ///     r#"<div class="p-name">Jane Doe</div><span class="followers">N/A</span>"#,
    ///     "",
    /// );
    /// assert_eq!(profile.name, "Jane Doe");
    /// assert_eq!(profile.followers, 0);
    /// ```
    pub fn new<G, F>(generator: G, configure: F) -> Result<Self>
    where
        G: Fn() -> V + Send + Sync + 'static,
        F: FnOnce(&mut ParserBuilder<V>),
    {
        Self::with_options(generator, ParseOptions::default(), configure)
    }

    /// Like [`Parser::new`]; `options` are in effect before any registration
    pub fn with_options<G, F>(generator: G, options: ParseOptions, configure: F) -> Result<Self>
    where
        G: Fn() -> V + Send + Sync + 'static,
        F: FnOnce(&mut ParserBuilder<V>),
    {
        let mut builder = ParserBuilder::with_options(options);
        builder.generator(generator);
        configure(&mut builder);
        builder.build()
    }
}

impl<V> Parser<V> {
    pub(crate) fn from_parts(
        generator: Generator<V>,
        converters: Vec<Converter<V>>,
        options: ParseOptions,
    ) -> Self {
        Self {
            generator,
            converters,
            options,
        }
    }

    /// Converters in execution order
    pub fn converters(&self) -> &[Converter<V>] {
        &self.converters
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn new_instance(&self) -> V {
        (self.generator)()
    }

    /// Run every converter against `root`, writing into an existing instance.
    /// An absent root leaves the instance untouched.
    pub fn apply(&self, root: Option<Node<'_>>, instance: &mut V) {
        apply_all(&self.converters, root, instance);
    }

    /// Generate a fresh instance and fill it from `root`
    pub fn parse_node(&self, root: Option<Node<'_>>) -> V {
        let mut instance = self.new_instance();
        self.apply(root, &mut instance);
        instance
    }

    pub fn parse_document(&self, document: &Document) -> V {
        debug!(
            converters = self.converters.len(),
            base_url = document.base_url().map(Url::as_str),
            "parsing document"
        );
        self.parse_html(document.html(), document.base_url())
    }

    pub fn parse_html(&self, html: &Html, base: Option<&Url>) -> V {
        self.parse_node(Some(Node::new(html.root_element(), base)))
    }

    /// Parse decoded HTML; `base_url` may be empty
    pub fn parse_str(&self, source: &str, base_url: &str) -> V {
        self.parse_document(&Document::parse(source, base_url))
    }

    /// Decode `bytes` with the declared charset (default from the options)
    pub fn parse_bytes(&self, bytes: &[u8], charset: Option<&str>, base_url: &str) -> V {
        let encoding = encoding_for(charset, &self.options);
        self.parse_document(&Document::from_bytes(bytes, encoding, base_url))
    }

    /// Read a byte stream to the end and parse it
    pub fn parse_reader<R: Read>(
        &self,
        reader: R,
        charset: Option<&str>,
        base_url: &str,
    ) -> Result<V> {
        let encoding = encoding_for(charset, &self.options);
        let document = Document::from_reader(reader, encoding, base_url)?;
        Ok(self.parse_document(&document))
    }
}

impl<V> fmt::Debug for Parser<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("converters", &self.converters)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

pub(crate) fn apply_all<V>(converters: &[Converter<V>], root: Option<Node<'_>>, instance: &mut V) {
    let Some(root) = root else {
        return;
    };
    for converter in converters {
        converter.apply(root, instance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Page {
        title: String,
        count: i32,
        tags: Vec<String>,
        log: Vec<&'static str>,
    }

    const PAGE: &str = r#"
    <html>
    <body>
        <h1>Listing</h1>
        <span class="count">3</span>
        <a class="tag">red</a>
        <a class="tag">green</a>
    </body>
    </html>
    "#;

    #[test]
    fn test_missing_generator() {
        let mut builder = Parser::<Page>::builder();
        builder.text_into("h1", |p: &mut Page| &mut p.title);
        assert!(matches!(builder.build(), Err(Error::MissingInstanceGenerator)));
    }

    #[test]
    fn test_converters_run_in_registration_order() {
        let parser = Parser::new(Page::default, |p| {
            p.text("h1", |_, page: &mut Page| page.log.push("title"));
            p.selections(".tag", |_, page: &mut Page| page.log.push("tag"));
            p.int("missing", |_, page: &mut Page| page.log.push("count"));
        })
        .unwrap();

        let page = parser.parse_str(PAGE, "");
        assert_eq!(page.log, vec!["title", "tag", "tag", "count"]);
        assert_eq!(parser.converters().len(), 3);
    }

    #[test]
    fn test_independent_instances() {
        let parser = Parser::new(Page::default, |p| {
            p.text_into("h1", |v: &mut Page| &mut v.title);
            p.collection(".tag", |n| n.text(), |v: &mut Page| &mut v.tags);
        })
        .unwrap();

        let mut first = parser.parse_str(PAGE, "");
        let second = parser.parse_str(PAGE, "");
        first.tags.push("mutated".to_string());

        assert_eq!(second.tags, vec!["red", "green"]);
        assert_eq!(first.title, second.title);
        assert_ne!(first, second);
    }

    #[test]
    fn test_absent_root_is_untouched() {
        let parser = Parser::new(
            || Page {
                count: 7,
                ..Page::default()
            },
            |p| {
                p.int_into(".count", |v: &mut Page| &mut v.count);
            },
        )
        .unwrap();

        assert_eq!(parser.parse_node(None).count, 7);
        assert_eq!(parser.parse_str(PAGE, "").count, 3);
    }

    #[test]
    fn test_apply_into_existing_instance() {
        let parser = Parser::new(Page::default, |p| {
            p.collection(".tag", |n| n.text(), |v: &mut Page| &mut v.tags);
        })
        .unwrap();

        let document = Document::parse(PAGE, "");
        let mut page = Page::default();
        parser.apply(Some(document.root()), &mut page);
        parser.apply(Some(document.root()), &mut page);
        assert_eq!(page.tags.len(), 4);
    }

    #[test]
    fn test_parse_reader_and_bytes() {
        let parser = Parser::new(HashMap::<String, String>::new, |p| {
            p.text("h1", |text, map: &mut HashMap<String, String>| {
                map.insert("title".to_string(), text);
            });
        })
        .unwrap();

        let from_reader = parser
            .parse_reader(std::io::Cursor::new(PAGE.as_bytes()), None, "")
            .unwrap();
        assert_eq!(from_reader["title"], "Listing");

        let latin = b"<h1>Pr\xe9cis</h1>";
        let from_bytes = parser.parse_bytes(latin, Some("ISO-8859-1"), "");
        assert_eq!(from_bytes["title"], "Précis");
    }

    #[test]
    fn test_parse_reader_propagates_io_errors() {
        struct Broken;

        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("connection reset"))
            }
        }

        let parser = Parser::new(Page::default, |_| {}).unwrap();
        assert!(matches!(
            parser.parse_reader(Broken, None, ""),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_parser_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Parser<Page>>();
    }

    #[test]
    fn test_concurrent_parses() {
        let parser = Parser::new(Page::default, |p| {
            p.text_into("h1", |v: &mut Page| &mut v.title);
            p.int_into(".count", |v: &mut Page| &mut v.count);
        })
        .unwrap();

        let pages: Vec<Page> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| parser.parse_str(PAGE, "")))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(pages.len(), 4);
        assert!(pages.iter().all(|p| p.title == "Listing" && p.count == 3));
    }
}
