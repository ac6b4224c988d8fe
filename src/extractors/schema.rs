//! Tabular-schema (data dictionary JSON) extraction.
//!
//! A data-dictionary file describes one table: `schema`, `table`,
//! `table_description`, `source` locations, `table_id` primary keys and a
//! `column_types` mapping. Files without both `schema` and `table` are valid
//! JSON outside this extractor's scope and only yield the raw passage.

use std::path::Path;

use serde_json::{Map, Value};

use super::{raw_passage, read_source, source_of, DocIds, Extraction, Extractor};
use crate::error::ExtractIssue;
use crate::types::{MetadataField, Passage};

const NOT_AVAILABLE: &str = "N/A";
/// Sentinel some dictionaries use for "no max length".
const NO_LENGTH: &str = "None";

/// Suffix of the per-table summary `doc_id`.
pub const TABLE_SUMMARY_ID: &str = "__TABLE_SUMMARY__";

/// Extractor for data-dictionary JSON files.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaExtractor;

impl SchemaExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract passages from already-loaded JSON text.
    pub fn extract(&self, source: &str, content: &str) -> Extraction {
        let mut extraction = Extraction::new();
        extraction.push(raw_passage(source, content));

        let data: Value = match serde_json::from_str(content) {
            Ok(data) => data,
            Err(e) => {
                extraction.report(ExtractIssue::Malformed {
                    path: source.to_string(),
                    format: "JSON",
                    message: e.to_string(),
                });
                return extraction;
            }
        };

        let Some(entity) = data.as_object() else {
            return extraction;
        };
        let (Some(schema), Some(table)) = (text(entity.get("schema")), text(entity.get("table")))
        else {
            return extraction;
        };

        let qualified = format!("{schema}.{table}");
        let description =
            text(entity.get("table_description")).unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let mut ids = DocIds::new();

        let base = |text: String| {
            Passage::new(text, source)
                .with(MetadataField::Schema, &schema)
                .with(MetadataField::Table, &qualified)
                .with(MetadataField::TableDescription, &description)
        };

        let mut summary = format!(
            "This document describes the table '{qualified}'. Description: {}.",
            sentence(&description)
        );
        let primary_keys = text_list(entity.get("table_id"));
        if !primary_keys.is_empty() {
            summary.push_str(&format!(" The primary key(s) are: {}.", primary_keys.join(", ")));
        }
        let sources = text_list(entity.get("source"));
        if !sources.is_empty() {
            summary.push_str(&format!(
                " It is sourced from the following locations: {}.",
                sources.join(", ")
            ));
        }
        extraction.push(base(summary).with(
            MetadataField::DocId,
            ids.claim(format!("{qualified}:{TABLE_SUMMARY_ID}")),
        ));

        if let Some(columns) = entity.get("column_types").and_then(Value::as_object) {
            for (column, descriptor) in columns {
                let text = column_text(&qualified, column, descriptor.as_object());
                extraction.push(
                    base(text)
                        .with(MetadataField::DocId, ids.claim(format!("{qualified}:{column}")))
                        .with(MetadataField::Column, column),
                );
            }
        }
        extraction
    }
}

impl Extractor for SchemaExtractor {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn process(&self, path: &Path) -> Extraction {
        let mut failed = Extraction::new();
        match read_source(path, &mut failed) {
            Some(content) => self.extract(&source_of(path), &content),
            None => failed,
        }
    }
}

/// One column sentence. The PII clause only appears when a level is declared.
fn column_text(qualified: &str, column: &str, descriptor: Option<&Map<String, Value>>) -> String {
    let field = |key: &str| descriptor.and_then(|d| d.get(key));

    let column_type = text(field("column_type")).unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let description = text(field("description")).unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let mut out = format!(
        "In table '{qualified}', the column '{column}' has type '{column_type}'. \
         Description: {}.",
        sentence(&description)
    );

    if let Some(length) = text(field("max_length")).filter(|l| l != NO_LENGTH) {
        out.push_str(&format!(" It has a max length of '{length}'."));
    }
    match field("is_nullable").and_then(Value::as_bool) {
        Some(true) => out.push_str(" It is nullable."),
        Some(false) => out.push_str(" It is not nullable."),
        None => {}
    }
    if let Some(level) = text(field("pii_confidentiality_impact_level")) {
        out.push_str(&format!(
            " It has a PII confidentiality impact level of '{level}'."
        ));
    }
    out
}

/// Description text without its own closing period, so the template adds exactly one.
fn sentence(description: &str) -> &str {
    description.strip_suffix('.').unwrap_or(description)
}

/// Plain text of a scalar JSON value. `null` is absent.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// A list of scalars, or a single scalar treated as a one-element list.
fn text_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(|v| text(Some(v))).collect(),
        other => text(other).into_iter().collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
