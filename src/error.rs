//! Error types for parser construction and document loading
//!
//! Extraction itself never fails: missing matches and malformed values fall
//! back to zero values. Errors only surface while a parser is being built or
//! while its input is being read.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("parser has no instance generator")]
    MissingInstanceGenerator,

    #[error("invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("empty CSS selector rejected by parse options")]
    EmptySelector,

    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid extraction schema: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("unknown accessor '{accessor}' for field '{alias}'")]
    UnknownAccessor { alias: String, accessor: String },

    #[error("unknown target type '{target_type}' for field '{alias}'")]
    UnknownTargetType { alias: String, target_type: String },
}

impl Error {
    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
