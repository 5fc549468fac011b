use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures while reading the results table. Nothing downstream can run without a dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed table: {0}")]
    Csv(#[from] csv::Error),
    #[error("required column `{0}` not found in header")]
    MissingColumn(String),
    #[error("row {row}: column `{column}` has invalid numeric value `{value}`")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },
    #[error("delimiter `{0}` is not a single-byte character")]
    InvalidDelimiter(char),
    #[error("invalid sub-category pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Non-fatal conditions surfaced to the user next to the results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    MissingOptionalColumn { column: String, feature: String },
    IgnoredFilterValue { dimension: String, value: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::MissingOptionalColumn { column, feature } => {
                write!(f, "column `{}` not found, {} disabled", column, feature)
            }
            Notice::IgnoredFilterValue { dimension, value } => {
                write!(f, "{} `{}` is not offered under the current selection, ignored", dimension, value)
            }
        }
    }
}
