//! Declarative extraction schemas
//!
//! A schema is a list of field rules loaded from JSON. Each rule names a CSS
//! selector, an accessor and a target type, and is compiled into converters
//! of a `Parser` producing a JSON object keyed by the rule aliases.
//!
//! ```json
//! {
//!   "fields": [
//!     {"alias": "title", "selector": "h1"},
//!     {"alias": "price", "selector": ".price", "target_type": "double",
//!      "alternatives": [{"selector": "meta[itemprop=price]", "accessor": "attr:content"}]},
//!     {"alias": "images", "selector": "img", "accessor": "abs:src", "multiple": true}
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::builder::ParserBuilder;
use crate::coerce::Coerce;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::node::Extract;
use crate::options::ParseOptions;
use crate::parser::Parser;

type Record = Map<String, Value>;

/// Complete schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionSchema {
    pub fields: Vec<FieldRule>,
}

/// Single field rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    /// Output key; alternatives write under their parent's alias
    #[serde(default)]
    pub alias: String,
    /// CSS selector
    pub selector: String,
    /// text, own_text, html, inner_html, attr:<name> or abs:<name>
    #[serde(default)]
    pub accessor: Option<String>,
    /// string, int, long, float, double, bool or json
    #[serde(default)]
    pub target_type: Option<String>,
    /// Collect every match into an array instead of the first one
    #[serde(default)]
    pub multiple: bool,
    /// Rules tried in order when this one yields nothing
    #[serde(default)]
    pub alternatives: Vec<FieldRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetType {
    String,
    Int,
    Long,
    Float,
    Double,
    Bool,
    Json,
}

impl TargetType {
    fn parse(alias: &str, target_type: Option<&str>) -> Result<Self> {
        let Some(name) = target_type else {
            return Ok(Self::String);
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "string" | "text" => Ok(Self::String),
            "int" | "integer" => Ok(Self::Int),
            "long" | "bigint" => Ok(Self::Long),
            "float" => Ok(Self::Float),
            "double" | "number" => Ok(Self::Double),
            "bool" | "boolean" => Ok(Self::Bool),
            "json" => Ok(Self::Json),
            _ => Err(Error::UnknownTargetType {
                alias: alias.to_string(),
                target_type: name.to_string(),
            }),
        }
    }

    fn zero(self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Int | Self::Long => Value::from(0),
            Self::Float | Self::Double => Value::from(0.0),
            Self::Bool => Value::Bool(false),
            Self::Json => Value::Null,
        }
    }

    fn to_value(self, text: String) -> Value {
        match self {
            Self::String => Value::String(text),
            Self::Int => Value::from(i32::coerce(&text)),
            Self::Long => Value::from(i64::coerce(&text)),
            Self::Float => Value::from(f32::coerce(&text)),
            Self::Double => Value::from(f64::coerce(&text)),
            Self::Bool => Value::Bool(bool::coerce(&text)),
            // not JSON: keep the raw text
            Self::Json => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        }
    }
}

/// A rule with its alternatives flattened and accessor/type resolved
struct ResolvedRule {
    alias: String,
    selector: String,
    extract: Extract,
    target: TargetType,
    multiple: bool,
}

impl ResolvedRule {
    fn register(self, builder: &mut ParserBuilder<Record>) {
        let Self {
            alias,
            selector,
            extract,
            target,
            multiple,
        } = self;

        if multiple {
            builder.collect(
                &selector,
                move |node| target.to_value(extract.apply(&node)),
                move |items, record: &mut Record| {
                    if !items.is_empty() && !record.contains_key(&alias) {
                        record.insert(alias.clone(), Value::Array(items));
                    }
                },
            );
        } else {
            builder.select(&selector, move |node, record: &mut Record| {
                if let Some(node) = node {
                    if !record.contains_key(&alias) {
                        record.insert(alias.clone(), target.to_value(extract.apply(&node)));
                    }
                }
            });
        }
    }
}

impl ExtractionSchema {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn compile(&self) -> Result<CompiledSchema> {
        self.compile_with(ParseOptions::default())
    }

    pub fn compile_with(&self, options: ParseOptions) -> Result<CompiledSchema> {
        let mut rules = Vec::new();
        let mut defaults = Vec::new();

        for field in &self.fields {
            let target = TargetType::parse(&field.alias, field.target_type.as_deref())?;
            let zero = if field.multiple {
                Value::Array(Vec::new())
            } else {
                target.zero()
            };
            defaults.push((field.alias.clone(), zero));
            resolve(field, &field.alias, target, field.multiple, &mut rules)?;
        }

        let parser = Parser::with_options(Record::new, options, |builder| {
            for rule in rules {
                rule.register(builder);
            }
        })?;

        Ok(CompiledSchema { parser, defaults })
    }
}

/// Flatten `rule` and its alternatives, depth first, in declaration order
fn resolve(
    rule: &FieldRule,
    alias: &str,
    parent_target: TargetType,
    multiple: bool,
    out: &mut Vec<ResolvedRule>,
) -> Result<()> {
    let extract = match rule.accessor.as_deref() {
        None => Extract::Text,
        Some(accessor) => accessor
            .parse()
            .map_err(|accessor| Error::UnknownAccessor {
                alias: alias.to_string(),
                accessor,
            })?,
    };
    let target = match rule.target_type.as_deref() {
        None => parent_target,
        Some(name) => TargetType::parse(alias, Some(name))?,
    };

    out.push(ResolvedRule {
        alias: alias.to_string(),
        selector: rule.selector.clone(),
        extract,
        target,
        multiple,
    });
    for alternative in &rule.alternatives {
        resolve(alternative, alias, target, multiple, out)?;
    }
    Ok(())
}

/// A schema ready to run against documents
#[derive(Debug)]
pub struct CompiledSchema {
    parser: Parser<Record>,
    defaults: Vec<(String, Value)>,
}

impl CompiledSchema {
    pub fn parser(&self) -> &Parser<Record> {
        &self.parser
    }

    pub fn extract_document(&self, document: &Document) -> Record {
        let mut record = self.parser.parse_document(document);
        self.fill_defaults(&mut record);
        record
    }

    pub fn extract_str(&self, html: &str, base_url: &str) -> Record {
        self.extract_document(&Document::parse(html, base_url))
    }

    pub fn extract_bytes(&self, bytes: &[u8], charset: Option<&str>, base_url: &str) -> Record {
        let mut record = self.parser.parse_bytes(bytes, charset, base_url);
        self.fill_defaults(&mut record);
        record
    }

    fn fill_defaults(&self, record: &mut Record) {
        for (alias, zero) in &self.defaults {
            record.entry(alias.clone()).or_insert_with(|| zero.clone());
        }
    }
}
