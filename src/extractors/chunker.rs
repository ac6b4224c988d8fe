//! Generic fallback chunker for allowed files without a dedicated extractor.
//!
//! Recursive character splitting: text is split on the coarsest separator
//! that occurs in it (paragraph, line, word, character), each separator
//! staying attached to the start of the piece that follows it. Pieces are
//! merged greedily into chunks of at most `chunk_size` characters, and each
//! new chunk re-uses up to `chunk_overlap` characters from the tail of the
//! previous one. Pieces still too large are split again with the next finer
//! separator.

use std::collections::VecDeque;
use std::path::Path;

use super::{source_of, Extraction, Extractor};
use crate::config::ChunkingConfig;
use crate::types::{MetadataField, Passage};

/// Separators from coarsest to finest. The empty separator splits characters.
pub const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Overlapping fixed-size text chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

impl TextChunker {
    /// Sizes are in characters. A zero `chunk_size` is treated as 1.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty chunks in original order.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, SEPARATORS)
    }

    /// One passage per chunk, each tagged with `source` and `chunk_index`.
    pub fn extract(&self, source: &str, content: &str) -> Extraction {
        let mut extraction = Extraction::new();
        for (index, chunk) in self.split_text(content).into_iter().enumerate() {
            extraction.push(
                Passage::new(chunk, source).with(MetadataField::ChunkIndex, index.to_string()),
            );
        }
        extraction
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = "";
        let mut finer: &[&str] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                break;
            }
            if text.contains(candidate) {
                separator = candidate;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }
            if !small.is_empty() {
                chunks.extend(self.merge(&small));
                small.clear();
            }
            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }
        if !small.is_empty() {
            chunks.extend(self.merge(&small));
        }
        chunks
    }

    /// Greedily merge small pieces into chunks with overlap.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window);
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(dropped) => total -= char_len(dropped),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }
        push_joined(&mut chunks, &window);
        chunks
    }
}

impl Extractor for TextChunker {
    fn name(&self) -> &'static str {
        "chunk"
    }

    /// Best-effort: unreadable files yield nothing and report nothing.
    fn process(&self, path: &Path) -> Extraction {
        match std::fs::read_to_string(path) {
            Ok(content) => self.extract(&source_of(path), &content),
            Err(e) => {
                tracing::debug!(path = %path.display(), "skipping unreadable file: {e}");
                Extraction::new()
            }
        }
    }
}

/// Split on `separator`, keeping it at the start of the following piece.
/// Empty pieces are dropped; an empty separator yields single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (at, _) in text.match_indices(separator) {
        if at > start {
            pieces.push(&text[start..at]);
        }
        start = at;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
