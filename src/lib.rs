//! repo-corpus: repository knowledge extraction.
//!
//! Turns a heterogeneous repository (workflow DAG definitions, data
//! dictionaries, SQL scripts, Python sources, plain text) into short,
//! independently retrievable passages with consistent metadata, ready to be
//! embedded and indexed by an external similarity-search component.

pub mod config;
pub mod error;
pub mod extractors;
pub mod indexer;
pub mod observability;
pub mod types;

pub use error::{CorpusError, ExtractIssue, Result};
pub use types::{CorpusRecord, Language, MetadataField, Passage};
