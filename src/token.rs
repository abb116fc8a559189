//! Token values accepted by the vectorizers.
//!
//! A corpus is either integer-valued or text-valued; the two kinds never mix
//! within one fit. Ordering is derived so that dictionaries can assign column
//! ids independently of the order tokens appear in the corpus.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single vocabulary item: an integer code or a text token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Token {
    Int(i64),
    Text(String),
}

impl Token {
    #[must_use]
    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Token {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}
