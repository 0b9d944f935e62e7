use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures at the edges of the pipeline. Extraction itself never fails.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid block JSON: {0}")]
    BlockJson(#[source] serde_json::Error),

    #[error("failed to encode schema: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("encoded schema is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
}
