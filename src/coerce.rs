//! Text to value coercion
//!
//! Every coercion is total: text that does not parse, and absent nodes, map
//! to the type's zero value. Malformed markup is therefore masked rather than
//! reported, so a page that renders `N/A` where a count is expected yields `0`.

use chrono::{NaiveDate, NaiveDateTime};

use crate::node::{Extract, Node};

/// A scalar type that node text can be converted into
pub trait Coerce: Sized {
    /// Value used when the node is absent or its text does not parse
    fn zero() -> Self;

    /// Parse already-extracted text, `None` when it is not a valid value
    fn parse_text(text: &str) -> Option<Self>;

    fn coerce(text: &str) -> Self {
        Self::parse_text(text).unwrap_or_else(Self::zero)
    }

    /// Extract from an optional node and coerce
    fn from_node(node: Option<&Node<'_>>, extract: &Extract) -> Self {
        match node {
            Some(node) => Self::coerce(&extract.apply(node)),
            None => Self::zero(),
        }
    }
}

impl Coerce for String {
    fn zero() -> Self {
        String::new()
    }

    fn parse_text(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

macro_rules! coerce_number {
    ($($ty:ty => $zero:expr),* $(,)?) => {
        $(
            impl Coerce for $ty {
                fn zero() -> Self {
                    $zero
                }

                fn parse_text(text: &str) -> Option<Self> {
                    text.trim().parse().ok()
                }
            }
        )*
    };
}

coerce_number! {
    i32 => 0,
    i64 => 0,
    u32 => 0,
    u64 => 0,
    f32 => 0.0,
    f64 => 0.0,
}

impl Coerce for bool {
    fn zero() -> Self {
        false
    }

    fn parse_text(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

/// Parse a date with a `chrono` format string, `None` on mismatch
pub fn parse_date(text: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), format).ok()
}

pub fn parse_datetime(text: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), format).ok()
}
