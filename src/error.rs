//! Crate-level errors
//!
//! Script-level failures never show up here: they are either diagnostics or
//! [`Fault`](crate::interpreter::Fault)s. These are the failures around the
//! engine (decoding syntax trees, loading configuration, reading files).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid syntax tree: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
