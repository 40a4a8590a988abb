//! Name patterns of aggregate nodes.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Selects which names an [`Aggregate`](crate::Aggregate) collects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// `*`: everything.
    All,
    /// `include:a,b`: only the listed names.
    Include(Vec<String>),
    /// `exclude:a,b`: everything except the listed names.
    Exclude(Vec<String>),
    /// `prefix:data-*`: names with the prefix, which is stripped.
    Prefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Undefined aggregate pattern `{0}`")]
pub struct PatternError(pub String);

impl Pattern {
    /// Returns the name under which `name` is collected, or `None` when the
    /// pattern rejects it.
    pub fn accepts(&self, name: &str) -> Option<String> {
        match self {
            Pattern::All => Some(name.to_string()),
            Pattern::Include(names) => names.iter().any(|n| n == name).then(|| name.to_string()),
            Pattern::Exclude(names) => (!names.iter().any(|n| n == name)).then(|| name.to_string()),
            Pattern::Prefix(prefix) => name
                .strip_prefix(prefix.as_str())
                .filter(|rest| !rest.is_empty())
                .map(str::to_string),
        }
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() || value == "*" {
            return Ok(Pattern::All);
        }

        let list = |names: &str| -> Vec<String> {
            names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect()
        };

        match value.split_once(':') {
            Some(("include", names)) => Ok(Pattern::Include(list(names))),
            Some(("exclude", names)) => Ok(Pattern::Exclude(list(names))),
            Some(("prefix", prefix)) => {
                let prefix = prefix.trim().trim_end_matches('*');
                if prefix.is_empty() {
                    return Err(PatternError(value.to_string()));
                }
                Ok(Pattern::Prefix(prefix.to_string()))
            }
            _ => Err(PatternError(value.to_string())),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::All => f.write_str("*"),
            Pattern::Include(names) => write!(f, "include:{}", names.join(",")),
            Pattern::Exclude(names) => write!(f, "exclude:{}", names.join(",")),
            Pattern::Prefix(prefix) => write!(f, "prefix:{prefix}*"),
        }
    }
}

impl Serialize for Pattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
