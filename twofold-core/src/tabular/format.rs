//! Tabular format names and unvalidated format hints

use crate::{Result, TwofoldError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the supported tabular formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Row-oriented delimited text
    Csv,
    /// Columnar binary tuned for compressed on-disk storage
    Parquet,
    /// Columnar binary tuned for IPC (Arrow IPC file format)
    Feather,
}

impl Format {
    /// The closed set of supported formats
    pub const ALL: [Format; 3] = [Format::Csv, Format::Parquet, Format::Feather];

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Parquet => "parquet",
            Format::Feather => "feather",
        }
    }

    /// Cargo feature providing the backend
    pub fn feature(self) -> &'static str {
        self.name()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = TwofoldError;

    fn from_str(name: &str) -> Result<Self> {
        Format::ALL
            .into_iter()
            .find(|format| format.name() == name)
            .ok_or_else(|| TwofoldError::UnsupportedFormat(name.to_string()))
    }
}

/// A candidate format name that has not been checked against the registry
///
/// Hints come from two places: the path suffix and the caller's explicit
/// `format` argument. Two hints are equal when their names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormatHint {
    pub name: String,
}

impl FormatHint {
    /// Hint taken from a path suffix such as `".CSV"`; `None` for `""`
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        let name = suffix.trim_start_matches('.').to_lowercase();
        (!name.is_empty()).then_some(Self { name })
    }

    /// Hint supplied explicitly by the caller
    pub fn explicit(name: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
        }
    }

    /// Check the hint against the supported set
    pub fn validate(&self) -> Result<Format> {
        self.name.parse()
    }
}

impl fmt::Display for FormatHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
