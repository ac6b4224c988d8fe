//! Query-script (SQL) extraction.
//!
//! Produces the cleaned script as the raw passage, then a one-sentence
//! summary of the tables the script's main query reads from. The main query
//! is isolated from common DDL wrappers (UNLOAD, CREATE [MATERIALIZED] VIEW,
//! CREATE TABLE AS) before table names are pulled out with `sqlparser`.

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use sqlparser::ast::{Query, TableFactor, Visit, Visitor};
use sqlparser::dialect::GenericDialect;
use sqlparser::keywords::Keyword;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};

use super::{read_source, source_of, Extraction, Extractor};
use crate::config::ScriptConfig;
use crate::error::{CorpusError, Result};
use crate::types::{MetadataField, Passage};

/// `content_type` of the table summary passage.
pub const SQL_SUMMARY: &str = "sql_summary";

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Extractor for SQL scripts.
#[derive(Debug, Clone)]
pub struct ScriptExtractor {
    strip_markers: Vec<String>,
}

impl Default for ScriptExtractor {
    fn default() -> Self {
        Self::from_config(&ScriptConfig::default())
    }
}

impl ScriptExtractor {
    pub fn new(strip_markers: Vec<String>) -> Self {
        Self { strip_markers }
    }

    pub fn from_config(config: &ScriptConfig) -> Self {
        Self::new(config.strip_markers.clone())
    }

    /// Drop every line that is exactly a configured marker, then trim.
    pub fn clean(&self, content: &str) -> String {
        content
            .lines()
            .filter(|line| !self.strip_markers.iter().any(|m| line.trim() == m))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    /// Extract passages from already-loaded script text.
    pub fn extract(&self, source: &str, content: &str) -> Extraction {
        let mut extraction = Extraction::new();
        let cleaned = self.clean(content);
        extraction.push(
            Passage::new(cleaned.as_str(), source)
                .with(MetadataField::DocId, format!("raw:{source}")),
        );

        match referenced_tables(isolate_body(&cleaned)) {
            Ok(tables) => {
                let listed = if tables.is_empty() {
                    "none".to_string()
                } else {
                    tables.join(", ")
                };
                extraction.push(
                    Passage::new(
                        format!("This SQL script reads from the following tables: {listed}."),
                        source,
                    )
                    .with(MetadataField::ContentType, SQL_SUMMARY),
                );
            }
            Err(e) => tracing::debug!(path = source, "table extraction skipped: {e}"),
        }
        extraction
    }
}

impl Extractor for ScriptExtractor {
    fn name(&self) -> &'static str {
        "script"
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
// Main-query isolation
// ---------------------------------------------------------------------------

/// Wrapper patterns, tried in order. Capture group 1 is the body.
const BODY_PATTERNS: &[&str] = &[
    r"(?is)\bunload\s*\(\s*\$\$(.*?)\$\$\s*\)",
    r"(?is)\bcreate\s+(?:or\s+replace\s+)?materialized\s+view\s+[^;]*?\s+as\s+(.*)",
    r"(?is)\bcreate\s+(?:or\s+replace\s+)?view\s+[^;]*?\s+as\s+(.*)",
    r"(?is)\bcreate\s+(?:or\s+replace\s+)?(?:temp(?:orary)?\s+)?table\s+[^;]*?\bas\b\s*(.*)",
];

fn body_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        BODY_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// Return the main query of a script: the body of the first matching DDL
/// wrapper, or the whole text when nothing matches.
///
/// A parenthesized `CREATE TABLE ... AS (...)` body is cut at its balancing
/// parenthesis, so nested subqueries survive.
pub fn isolate_body(sql: &str) -> &str {
    for re in body_patterns() {
        if let Some(body) = re.captures(sql).and_then(|c| c.get(1)) {
            let body = body.as_str().trim();
            return match body.strip_prefix('(') {
                Some(inner) => balanced_prefix(inner).trim(),
                None => body,
            };
        }
    }
    sql
}

/// Text up to the parenthesis closing an already-open one. Quoted text is
/// skipped. Unbalanced input returns everything.
fn balanced_prefix(s: &str) -> &str {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return &s[..i];
                }
            }
            _ => {}
        }
    }
    s
}

// ---------------------------------------------------------------------------
// Table extraction
// ---------------------------------------------------------------------------

/// Tables a query reads from, in first-seen order without duplicates.
///
/// CTE names and table-valued functions are excluded. SQL the parser rejects
/// falls back to a token scan of `FROM`/`JOIN` targets; only input the
/// tokenizer itself rejects is an error.
pub fn referenced_tables(sql: &str) -> Result<Vec<String>> {
    let dialect = GenericDialect {};
    match Parser::parse_sql(&dialect, sql) {
        Ok(statements) => {
            let mut collector = TableCollector::default();
            for statement in &statements {
                let _ = statement.visit(&mut collector);
            }
            Ok(collector.tables)
        }
        Err(e) => {
            tracing::debug!("SQL did not parse ({e}), scanning tokens");
            scan_tables(&dialect, sql)
        }
    }
}

#[derive(Debug, Default)]
struct TableCollector {
    ctes: HashSet<String>,
    tables: Vec<String>,
}

impl TableCollector {
    fn add(&mut self, name: String) {
        if !self.tables.contains(&name) {
            self.tables.push(name);
        }
    }
}

impl Visitor for TableCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.ctes.insert(cte.alias.name.value.to_lowercase());
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Self::Break> {
        if let TableFactor::Table {
            name, args: None, ..
        } = factor
        {
            let parts: Vec<&str> = name.0.iter().map(|ident| ident.value.as_str()).collect();
            let is_cte = parts.len() == 1 && self.ctes.contains(&parts[0].to_lowercase());
            if !is_cte {
                self.add(parts.join("."));
            }
        }
        ControlFlow::Continue(())
    }
}

/// Keywords that can follow `FROM`/`JOIN` without naming a table.
const NOT_A_TABLE: &[Keyword] = &[
    Keyword::SELECT,
    Keyword::LATERAL,
    Keyword::FROM,
    Keyword::JOIN,
    Keyword::WHERE,
    Keyword::ON,
    Keyword::GROUP,
    Keyword::ORDER,
    Keyword::LIMIT,
];

/// Token-level fallback: dotted names directly after `FROM` or `JOIN`.
fn scan_tables(dialect: &GenericDialect, sql: &str) -> Result<Vec<String>> {
    let tokens = Tokenizer::new(dialect, sql)
        .tokenize()
        .map_err(|e| CorpusError::Parse(e.to_string()))?;
    let tokens: Vec<&Token> = tokens
        .iter()
        .filter(|t| !matches!(t, Token::Whitespace(_)))
        .collect();

    let mut tables: Vec<String> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let is_source_keyword = matches!(
            tokens[i],
            Token::Word(w) if matches!(w.keyword, Keyword::FROM | Keyword::JOIN)
        );
        i += 1;
        if !is_source_keyword {
            continue;
        }

        let mut parts: Vec<&str> = Vec::new();
        while let Some(Token::Word(w)) = tokens.get(i) {
            if parts.is_empty() && NOT_A_TABLE.contains(&w.keyword) {
                break;
            }
            parts.push(&w.value);
            i += 1;
            if matches!(tokens.get(i), Some(Token::Period)) {
                i += 1;
            } else {
                break;
            }
        }
        let is_function = matches!(tokens.get(i), Some(Token::LParen));
        if !parts.is_empty() && !is_function {
            let name = parts.join(".");
            if !tables.contains(&name) {
                tables.push(name);
            }
        }
    }
    Ok(tables)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
