//! CLI error types.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("input exceeds the limit of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("input is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}
