//! Document loading
//!
//! Turns raw bytes, a declared charset and a base URL into a parsed
//! `scraper::Html` tree. Parsing itself is html5ever's job; this module only
//! decodes the bytes and keeps the base URL next to the tree so converters
//! can resolve relative links.

use std::io::Read;

use encoding_rs::Encoding;
use scraper::Html;
use tracing::{debug, warn};
use url::Url;

use crate::error::Result;
use crate::node::Node;
use crate::options::ParseOptions;

/// A parsed HTML document and the location it was loaded from
pub struct Document {
    html: Html,
    base: Option<Url>,
}

impl Document {
    pub fn new(html: Html, base: Option<Url>) -> Self {
        Self { html, base }
    }

    /// Parse already-decoded HTML
    pub fn parse(source: &str, base_url: &str) -> Self {
        Self::new(Html::parse_document(source), parse_base_url(base_url))
    }

    /// Decode `bytes` with `encoding` (a byte order mark overrides it) and parse
    pub fn from_bytes(bytes: &[u8], encoding: &'static Encoding, base_url: &str) -> Self {
        let (decoded, used, had_errors) = encoding.decode(bytes);
        if had_errors {
            debug!(
                encoding = used.name(),
                "malformed byte sequences replaced while decoding document"
            );
        }
        Self::parse(&decoded, base_url)
    }

    /// Read a whole byte stream, then decode and parse it
    pub fn from_reader<R: Read>(
        mut reader: R,
        encoding: &'static Encoding,
        base_url: &str,
    ) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self::from_bytes(&bytes, encoding, base_url))
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    /// The `<html>` element
    pub fn root(&self) -> Node<'_> {
        Node::new(self.html.root_element(), self.base.as_ref())
    }
}

/// Resolve a declared charset label, falling back to the configured default
pub fn encoding_for(charset: Option<&str>, options: &ParseOptions) -> &'static Encoding {
    let Some(label) = charset.map(str::trim).filter(|label| !label.is_empty()) else {
        return options.default_encoding();
    };
    match Encoding::for_label(label.as_bytes()) {
        Some(encoding) => encoding,
        None => {
            let fallback = options.default_encoding();
            warn!(
                charset = label,
                fallback = fallback.name(),
                "unknown charset, using default"
            );
            fallback
        }
    }
}

fn parse_base_url(base_url: &str) -> Option<Url> {
    let base_url = base_url.trim();
    if base_url.is_empty() {
        return None;
    }
    match Url::parse(base_url) {
        Ok(url) => Some(url),
        Err(e) => {
            debug!(base_url, error = %e, "ignoring invalid base URL");
            None
        }
    }
}
