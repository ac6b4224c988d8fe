//! Native tree-sitter parser wrapper.
//!
//! Grammars are statically linked and queries are embedded at compile time
//! via `include_str!` (see [`Language::query_source`]).
//!
//! `CodeParser` carries no fields. Tree-sitter's `Parser` is `!Send + !Sync`,
//! so a fresh parser is created on every call; `Parser::new()` is a single
//! allocation and `set_language` is a pointer swap. Compiled queries are
//! cached per language since every file of a walk reuses them.

use std::sync::OnceLock;

use crate::error::{CorpusError, Result};
use crate::types::Language;

/// Thin wrapper around native tree-sitter parsing and query compilation.
///
/// Zero-sized, `Send` and `Sync`. Create one with [`CodeParser::new`] and
/// reuse freely.
#[derive(Debug, Clone, Copy)]
pub struct CodeParser;

impl CodeParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse `content` using the grammar for `language` and return the
    /// concrete syntax tree.
    ///
    /// The tree is returned even when it contains `ERROR` nodes; callers
    /// decide what a partial tree means for them.
    pub fn parse(&self, content: &str, language: Language) -> Result<tree_sitter::Tree> {
        let ts_lang = Self::get_ts_language(language);

        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&ts_lang)
            .map_err(|e| CorpusError::Parse(format!("Language version mismatch: {e}")))?;

        parser.parse(content, None).ok_or_else(|| {
            CorpusError::Parse("tree-sitter returned None (timeout or cancellation)".into())
        })
    }

    /// Return the native `tree_sitter::Language` for a [`Language`] variant.
    #[must_use]
    pub fn get_ts_language(language: Language) -> tree_sitter::Language {
        match language {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }

    /// The compiled query for `language`, compiled once per process.
    pub fn query(language: Language) -> Result<&'static tree_sitter::Query> {
        static PYTHON: OnceLock<std::result::Result<tree_sitter::Query, String>> =
            OnceLock::new();
        let cell = match language {
            Language::Python => &PYTHON,
        };
        cell.get_or_init(|| Self::load_query(language).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| CorpusError::Parse(e.clone()))
    }

    /// Compile the `.scm` query source for `language` into a
    /// [`tree_sitter::Query`].
    pub fn load_query(language: Language) -> Result<tree_sitter::Query> {
        let ts_lang = Self::get_ts_language(language);
        let source = language.query_source();
        tree_sitter::Query::new(&ts_lang, source).map_err(|e| {
            CorpusError::Parse(format!("Query compilation error for {language}: {e}"))
        })
    }
}

impl Default for CodeParser {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
