//! Unit identifiers.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Identifier of a unit within a sorting.
///
/// Sorters label units either with integers or with free-form names. Integer
/// ids order numerically and always sort before names, so "lowest id" is
/// well defined for mixed sortings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnitId {
    /// Numeric unit label.
    Int(i64),
    /// Named unit label.
    Name(String),
}

impl UnitId {
    /// Numeric value, if this is an integer id.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Name(_) => None,
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Name(s) => f.write_str(s),
        }
    }
}

impl FromStr for UnitId {
    type Err = Infallible;

    /// Parses integers as `Int`, anything else as `Name`.
    ///
    /// Not an inverse of `Display` for names like `"7"`, which parse back as
    /// `Int(7)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.parse::<i64>() {
            Ok(v) => Self::Int(v),
            Err(_) => Self::Name(trimmed.to_string()),
        })
    }
}

impl From<i64> for UnitId {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for UnitId {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<u32> for UnitId {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<usize> for UnitId {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        Self::Name(s.to_string())
    }
}

impl From<String> for UnitId {
    fn from(s: String) -> Self {
        Self::Name(s)
    }
}
