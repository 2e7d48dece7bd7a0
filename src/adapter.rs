//! Response body conversion
//!
//! The seam between an HTTP layer and the extraction engine. The HTTP layer
//! asks for a converter for the result type it expects; a parser registered
//! for that type turns the body into an instance. No registered parser means
//! no converter, never a panic.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::options::ParseOptions;
use crate::parser::Parser;

/// A type that declares how it is extracted from a document
pub trait HtmlModel: Sized + 'static {
    fn parser() -> Result<Parser<Self>>;
}

/// Result type to parser lookup
#[derive(Default)]
pub struct ParserRegistry {
    parsers: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `parser` for `V`, replacing any earlier one
    pub fn register<V: 'static>(&mut self, parser: Parser<V>) -> &mut Self {
        self.parsers.insert(TypeId::of::<V>(), Arc::new(parser));
        self
    }

    pub fn register_model<M: HtmlModel>(&mut self) -> Result<&mut Self> {
        let parser = M::parser()?;
        Ok(self.register(parser))
    }

    pub fn get<V: 'static>(&self) -> Option<Arc<Parser<V>>> {
        let parser = self.parsers.get(&TypeId::of::<V>())?;
        Arc::clone(parser).downcast::<Parser<V>>().ok()
    }

    pub fn contains<V: 'static>(&self) -> bool {
        self.parsers.contains_key(&TypeId::of::<V>())
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("parsers", &self.parsers.len())
            .finish()
    }
}

/// Raw response body and its declared content type
#[derive(Debug, Clone, Copy)]
pub struct ResponseBody<'a> {
    bytes: &'a [u8],
    content_type: Option<&'a str>,
}

impl<'a> ResponseBody<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: &'a str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn content_type(&self) -> Option<&'a str> {
        self.content_type
    }

    /// `charset` parameter of the content type, if declared
    pub fn charset(&self) -> Option<&'a str> {
        self.content_type.and_then(charset_from_content_type)
    }
}

/// Extract the `charset` parameter from a `Content-Type` value
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"').trim();
        (!value.is_empty()).then_some(value)
    })
}

/// Resolves parsers for result types and converts response bodies
#[derive(Debug)]
pub struct ResponseAdapter {
    registry: Arc<ParserRegistry>,
    options: ParseOptions,
}

impl ResponseAdapter {
    pub fn new(registry: ParserRegistry) -> Self {
        Self::with_options(registry, ParseOptions::default())
    }

    pub fn with_options(registry: ParserRegistry, options: ParseOptions) -> Self {
        Self {
            registry: Arc::new(registry),
            options,
        }
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    /// Converter for `V` bound to the request URL, `None` when no parser is
    /// registered for `V`
    pub fn converter<V: 'static>(&self, request_url: &str) -> Option<ResponseConverter<V>> {
        let Some(parser) = self.registry.get::<V>() else {
            debug!(
                result_type = std::any::type_name::<V>(),
                "no converter available"
            );
            return None;
        };
        Some(ResponseConverter {
            parser,
            base_url: request_url.to_string(),
            default_charset: self.options.default_charset.clone(),
        })
    }

    pub fn convert<V: 'static>(&self, body: &ResponseBody<'_>, request_url: &str) -> Option<V> {
        self.converter::<V>(request_url)
            .map(|converter| converter.convert(body))
    }
}

/// Parser for one result type bound to the URL its body came from
pub struct ResponseConverter<V> {
    parser: Arc<Parser<V>>,
    base_url: String,
    default_charset: String,
}

impl<V> ResponseConverter<V> {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn convert(&self, body: &ResponseBody<'_>) -> V {
        let charset = body.charset().unwrap_or(self.default_charset.as_str());
        debug!(
            base_url = %self.base_url,
            charset,
            bytes = body.bytes().len(),
            "converting response body"
        );
        self.parser
            .parse_bytes(body.bytes(), Some(charset), &self.base_url)
    }

    /// Convert a streamed body
    pub fn convert_reader<R: Read>(&self, reader: R, content_type: Option<&str>) -> Result<V> {
        let charset = content_type
            .and_then(charset_from_content_type)
            .unwrap_or(self.default_charset.as_str());
        self.parser.parse_reader(reader, Some(charset), &self.base_url)
    }
}

impl<V> fmt::Debug for ResponseConverter<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseConverter")
            .field("base_url", &self.base_url)
            .field("default_charset", &self.default_charset)
            .finish_non_exhaustive()
    }
}
