//! Source-code extraction backed by tree-sitter.
//!
//! Yields the raw file, one summary of imported modules, and one passage per
//! function definition (nested and async ones included) with its docstring.

use std::collections::BTreeSet;
use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, QueryCursor};

use super::{raw_passage, read_source, source_of, Extraction, Extractor};
use crate::error::ExtractIssue;
use crate::indexer::parser::CodeParser;
use crate::types::{Language, MetadataField, Passage};

const NO_DOCSTRING: &str = "No docstring provided.";

/// Extractor for one source language.
#[derive(Debug, Clone, Copy)]
pub struct CodeExtractor {
    language: Language,
    parser: CodeParser,
}

impl CodeExtractor {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            parser: CodeParser::new(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// `content_type` of the import summary, e.g. `python_summary`.
    pub fn summary_content_type(&self) -> String {
        format!("{}_summary", self.language.as_str())
    }

    /// Extract passages from already-loaded source text.
    pub fn extract(&self, source: &str, content: &str) -> Extraction {
        let mut extraction = Extraction::new();
        extraction.push(raw_passage(source, content));

        let malformed = |message: String| ExtractIssue::Malformed {
            path: source.to_string(),
            format: self.language.display_name(),
            message,
        };

        let tree = match self.parser.parse(content, self.language) {
            Ok(tree) => tree,
            Err(e) => {
                extraction.report(malformed(e.to_string()));
                return extraction;
            }
        };
        let root = tree.root_node();
        if let Some(error) = first_error(root) {
            let at = error.start_position();
            extraction.report(malformed(format!(
                "syntax error at line {}, column {}",
                at.row + 1,
                at.column + 1
            )));
            return extraction;
        }

        let query = match CodeParser::query(self.language) {
            Ok(query) => query,
            Err(e) => {
                tracing::error!("{e}");
                return extraction;
            }
        };
        let capture_names = query.capture_names();

        let mut imports: BTreeSet<String> = BTreeSet::new();
        let mut functions: Vec<(usize, String, Option<String>)> = Vec::new();

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, root, content.as_bytes());
        while let Some(m) = matches.next() {
            let mut name: Option<Node> = None;
            let mut body: Option<Node> = None;
            for capture in m.captures {
                let node = capture.node;
                match capture_names[capture.index as usize] {
                    "import.module" => {
                        if let Some(module) = node_text(node, content) {
                            imports.insert(module.split_whitespace().collect());
                        }
                    }
                    "import.future" => {
                        imports.insert("__future__".to_string());
                    }
                    "function.name" => name = Some(node),
                    "function.body" => body = Some(node),
                    _ => {}
                }
            }
            if let Some(name) = name {
                if let Some(text) = node_text(name, content) {
                    let doc = body.and_then(|b| docstring(b, content));
                    functions.push((name.start_byte(), text.to_string(), doc));
                }
            }
        }

        let listed = if imports.is_empty() {
            "none".to_string()
        } else {
            imports.into_iter().collect::<Vec<_>>().join(", ")
        };
        extraction.push(
            Passage::new(
                format!(
                    "This {} script imports the following libraries: {listed}.",
                    self.language.display_name()
                ),
                source,
            )
            .with(MetadataField::ContentType, self.summary_content_type()),
        );

        functions.sort_by_key(|(start, _, _)| *start);
        for (_, name, doc) in functions {
            let text = format!(
                "Function '{name}': {}",
                doc.as_deref().unwrap_or(NO_DOCSTRING)
            );
            extraction.push(Passage::new(text, source).with(MetadataField::FunctionName, name));
        }
        extraction
    }
}

impl Extractor for CodeExtractor {
    fn name(&self) -> &'static str {
        "code"
    }

    fn process(&self, path: &Path) -> Extraction {
        let mut failed = Extraction::new();
        match read_source(path, &mut failed) {
            Some(content) => self.extract(&source_of(path), &content),
            None => failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Tree helpers
// ---------------------------------------------------------------------------

fn node_text<'a>(node: Node, content: &'a str) -> Option<&'a str> {
    node.utf8_text(content.as_bytes()).ok()
}

/// Leftmost `ERROR` or `MISSING` node, if the tree has any.
fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut walk = node.walk();
    let children: Vec<Node> = node.children(&mut walk).collect();
    children.into_iter().find_map(first_error)
}

/// Docstring of a function body: its first statement, when that statement is
/// a plain string literal (or an implicit concatenation of them).
fn docstring(body: Node, content: &str) -> Option<String> {
    let mut walk = body.walk();
    let first = body
        .named_children(&mut walk)
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let mut walk = first.walk();
    let expr = first.named_children(&mut walk).next()?;

    let raw = match expr.kind() {
        "string" => string_body(expr, content)?.to_string(),
        "concatenated_string" => {
            let mut walk = expr.walk();
            let parts: Option<Vec<&str>> = expr
                .named_children(&mut walk)
                .filter(|n| n.kind() == "string")
                .map(|n| string_body(n, content))
                .collect();
            parts?.concat()
        }
        _ => return None,
    };
    let cleaned = clean_docstring(&raw);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Source text between a string's quotes. f-strings and bytes are not
/// docstrings.
fn string_body<'a>(node: Node, content: &'a str) -> Option<&'a str> {
    let mut walk = node.walk();
    let children: Vec<Node> = node.children(&mut walk).collect();
    let start = children.iter().find(|c| c.kind() == "string_start")?;
    let end = children.iter().rev().find(|c| c.kind() == "string_end")?;
    let prefix = node_text(*start, content)?;
    if prefix.chars().any(|c| matches!(c, 'f' | 'F' | 'b' | 'B')) {
        return None;
    }
    content.get(start.end_byte()..end.start_byte())
}

/// Normalize docstring indentation the way Python's `inspect.cleandoc` does:
/// tabs expand to 8 columns, the first line loses leading whitespace, the
/// common indent of the remaining lines is removed, and blank lines at both
/// ends are dropped. Trailing whitespace on each line is removed as well.
pub fn clean_docstring(doc: &str) -> String {
    let expanded = expand_tabs(doc, 8);
    let lines: Vec<&str> = expanded.split('\n').collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min();

    let mut out: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let line = match (i, margin) {
                (0, _) => line.trim_start(),
                (_, None) => line,
                (_, Some(m)) => line.get(m..).unwrap_or_else(|| line.trim_start()),
            };
            line.trim_end()
        })
        .collect();

    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    let leading = out.iter().take_while(|l| l.is_empty()).count();
    out[leading..].join("\n")
}

fn expand_tabs(text: &str, width: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut column = 0usize;
    for c in text.chars() {
        match c {
            '\t' => {
                let pad = width - (column % width);
                out.extend(std::iter::repeat(' ').take(pad));
                column += pad;
            }
            '\n' | '\r' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
