//! Format-specific extractors: turn one file into an ordered list of passages.
//!
//! Every extractor is stateless and total. It never panics and never returns
//! an error. I/O and parse failures become [`ExtractIssue`]s attached to the
//! [`Extraction`], and whatever passages were built before the failure are
//! kept.

pub mod chunker;
pub mod code;
pub mod dependencies;
pub mod schema;
pub mod script;
pub mod workflow;

use std::collections::HashSet;
use std::path::Path;

use crate::error::ExtractIssue;
use crate::types::{MetadataField, Passage};

pub use chunker::TextChunker;
pub use code::CodeExtractor;
pub use dependencies::TaskDependencies;
pub use schema::SchemaExtractor;
pub use script::ScriptExtractor;
pub use workflow::WorkflowExtractor;

/// Shared capability of every extractor variant.
pub trait Extractor: Send + Sync {
    /// Short stable name, used in logs.
    fn name(&self) -> &'static str;

    /// Convert one file into passages. Order is significant and stable.
    fn process(&self, path: &Path) -> Extraction;
}

/// Result of processing one file.
#[derive(Debug, Default)]
pub struct Extraction {
    pub passages: Vec<Passage>,
    pub issues: Vec<ExtractIssue>,
}

impl Extraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, passage: Passage) {
        self.passages.push(passage);
    }

    /// Record an issue and emit it as a warning.
    pub fn report(&mut self, issue: ExtractIssue) {
        tracing::warn!(path = issue.path(), "{issue}");
        self.issues.push(issue);
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

/// Display form of a path, used as the `source` metadata value.
pub(crate) fn source_of(path: &Path) -> String {
    path.display().to_string()
}

/// Read a whole file as UTF-8, reporting failure on `extraction`.
pub(crate) fn read_source(path: &Path, extraction: &mut Extraction) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(source) => {
            extraction.report(ExtractIssue::Unreadable {
                path: source_of(path),
                source,
            });
            None
        }
    }
}

/// The raw full-content passage every readable file starts with.
pub(crate) fn raw_passage(source: &str, content: &str) -> Passage {
    Passage::new(content, source).with(MetadataField::DocId, format!("raw:{source}"))
}

/// Hands out `doc_id`s that are unique within one file's output.
///
/// A repeated candidate gets `#2`, `#3`, ... appended, so ids stay
/// deterministic for unchanged input.
#[derive(Debug, Default)]
pub(crate) struct DocIds {
    seen: HashSet<String>,
}

impl DocIds {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn claim(&mut self, candidate: String) -> String {
        if self.seen.insert(candidate.clone()) {
            return candidate;
        }
        let mut n = 2usize;
        loop {
            let next = format!("{candidate}#{n}");
            if self.seen.insert(next.clone()) {
                return next;
            }
            n += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
