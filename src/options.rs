//! Parse options
//!
//! Loaded from JSON the same way extraction schemas are; every field has a
//! default so `{}` is a valid configuration.

use encoding_rs::{Encoding, UTF_8};
use serde::{Deserialize, Serialize};

/// What a converter does when registered with an empty selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySelectorPolicy {
    /// Log a warning and behave as if nothing matched
    #[default]
    FailOpen,
    /// Fail `ParserBuilder::build` with `Error::EmptySelector`
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Charset label used when none is declared
    pub default_charset: String,
    pub empty_selector: EmptySelectorPolicy,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            default_charset: "UTF-8".to_string(),
            empty_selector: EmptySelectorPolicy::default(),
        }
    }
}

impl ParseOptions {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Encoding for the configured default charset, UTF-8 if the label is unknown
    pub fn default_encoding(&self) -> &'static Encoding {
        Encoding::for_label(self.default_charset.trim().as_bytes()).unwrap_or(UTF_8)
    }
}
