//! Error type shared by the loaders, rule decoder and configuration.
//!
//! None of these escape the public decision API: every caller there logs the
//! error and falls back to "allow" / "no rewrite".

use std::path::PathBuf;

/// Error type for dataset loading and rule evaluation.
#[derive(Debug, thiserror::Error)]
pub enum BlockerError {
    #[error("Dataset unavailable: {name}")]
    DatasetUnavailable { name: String },
    #[error("Dataset file is empty: {}", path.display())]
    EmptyDataset { path: PathBuf },
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Engine rejected dataset: {name}")]
    Deserialize { name: String },
    #[error("Malformed rule set: {0}")]
    MalformedRuleSet(#[source] serde_json::Error),
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid configuration: {0}")]
    Config(#[source] serde_json::Error),
}

pub type Result<T, E = BlockerError> = std::result::Result<T, E>;
