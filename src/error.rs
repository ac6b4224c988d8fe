//! Error types for repo-corpus.
//!
//! Two layers:
//!
//! - [`CorpusError`]: failures the caller has to surface (bad config,
//!   missing repository root, sink write failures).
//! - [`ExtractIssue`]: per-file reports collected by extractors. These never
//!   abort a walk; they travel alongside the passages in an
//!   [`Extraction`](crate::extractors::Extraction).

use std::path::PathBuf;

use thiserror::Error;

/// Crate-level error type.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("repository root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, CorpusError>;

/// A reported, non-fatal problem with one file.
#[derive(Error, Debug)]
pub enum ExtractIssue {
    /// The file could not be opened or decoded as UTF-8.
    #[error("could not read file {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The whole file failed structural parsing.
    #[error("invalid {format} format in {path}: {message}")]
    Malformed {
        path: String,
        format: &'static str,
        message: String,
    },

    /// One sub-document of a multi-document stream failed; siblings survive.
    #[error("sub-document {index} of {path} skipped: {message}")]
    SubDocument {
        path: String,
        index: usize,
        message: String,
    },
}

impl ExtractIssue {
    /// Path of the file this issue is attributed to.
    pub fn path(&self) -> &str {
        match self {
            Self::Unreadable { path, .. }
            | Self::Malformed { path, .. }
            | Self::SubDocument { path, .. } => path,
        }
    }
}
