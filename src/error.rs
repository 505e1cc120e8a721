use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ArchiveError {
    #[error("invalid item id: {0}")]
    InvalidItemId(String),

    #[error("invalid label (path separators are not allowed): {0}")]
    InvalidLabel(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to decode label cache: {0}")]
    CacheDecode(String),

    #[error("failed to encode label cache: {0}")]
    CacheEncode(String),

    #[error("operator prompt failed: {0}")]
    Prompt(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
