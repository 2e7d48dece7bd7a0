//! Declarative CSS selector extraction for HTML documents
//!
//! Describe how a result type is filled from a document once, then run that
//! description against any number of documents:
//! - `Parser` / `ParserBuilder`: ordered converters bound to CSS selectors
//! - Scalar coercion with zero-value fallbacks (text, numbers, bools, dates)
//! - Collections, maps and nested parsers merged into the target instance
//! - `ResponseAdapter`: response body conversion keyed by result type
//! - `ExtractionSchema`: JSON-declared field rules compiled into a parser

pub mod adapter;
pub mod builder;
pub mod coerce;
pub mod converter;
pub mod document;
pub mod error;
pub mod node;
pub mod options;
pub mod parser;
pub mod schema;

pub use adapter::{
    charset_from_content_type, HtmlModel, ParserRegistry, ResponseAdapter, ResponseBody,
    ResponseConverter,
};
pub use builder::ParserBuilder;
pub use coerce::{parse_date, parse_datetime, Coerce};
pub use converter::{Converter, MatchPolicy};
pub use document::{encoding_for, Document};
pub use error::{Error, Result};
pub use node::{Extract, Node};
pub use options::{EmptySelectorPolicy, ParseOptions};
pub use parser::Parser;
pub use schema::{CompiledSchema, ExtractionSchema, FieldRule};
