//! Core domain types for repo-corpus.
//!
//! A [`Passage`] is the unit every extractor produces: a short retrievable
//! text plus a flat metadata map. Metadata keys are a closed enum
//! ([`MetadataField`]) whose string names are a stable contract with the
//! downstream query-construction component. Renaming a field breaks it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Source languages with a dedicated code extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
}

impl Language {
    /// Lowercase name, also used to build the `<language>_summary` content type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
        }
    }

    /// Human-facing name used in generated sentences.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Python => "Python",
        }
    }

    /// Embedded `.scm` query source for this language.
    pub fn query_source(&self) -> &'static str {
        match self {
            Self::Python => include_str!("../queries/python.scm"),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MetadataField
// ---------------------------------------------------------------------------

/// Every metadata key a passage may carry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    Source,
    DocId,
    DagId,
    Owner,
    Schedule,
    TaskName,
    Operator,
    DagDescription,
    ScriptFile,
    Schema,
    Table,
    Column,
    TableDescription,
    ContentType,
    FunctionName,
    ChunkIndex,
}

impl MetadataField {
    /// All fields, in declaration order.
    pub const ALL: &'static [MetadataField] = &[
        Self::Source,
        Self::DocId,
        Self::DagId,
        Self::Owner,
        Self::Schedule,
        Self::TaskName,
        Self::Operator,
        Self::DagDescription,
        Self::ScriptFile,
        Self::Schema,
        Self::Table,
        Self::Column,
        Self::TableDescription,
        Self::ContentType,
        Self::FunctionName,
        Self::ChunkIndex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::DocId => "doc_id",
            Self::DagId => "dag_id",
            Self::Owner => "owner",
            Self::Schedule => "schedule",
            Self::TaskName => "task_name",
            Self::Operator => "operator",
            Self::DagDescription => "dag_description",
            Self::ScriptFile => "script_file",
            Self::Schema => "schema",
            Self::Table => "table",
            Self::Column => "column",
            Self::TableDescription => "table_description",
            Self::ContentType => "content_type",
            Self::FunctionName => "function_name",
            Self::ChunkIndex => "chunk_index",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == normalized)
    }

    /// One-line description handed to the query-construction component.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Source => "The absolute file path of the source document.",
            Self::DocId => "Stable identifier of the passage within the corpus.",
            Self::DagId => "The unique identifier for an Airflow DAG.",
            Self::Owner => "The owner or creator of a DAG, usually an email address.",
            Self::Schedule => "The cron schedule for a DAG, e.g., '0 5 * * 1'.",
            Self::TaskName => "The name of a specific task within a DAG.",
            Self::Operator => {
                "The type of operator used by a DAG task, e.g., 'ecs' or 'databricks'."
            }
            Self::DagDescription => "The description of an Airflow DAG.",
            Self::ScriptFile => {
                "The name of the script file executed by a task, e.g., 'main.py'."
            }
            Self::Schema => "The name of a database schema.",
            Self::Table => "The qualified name of a database table (schema.table).",
            Self::Column => "The name of a column in a database table.",
            Self::TableDescription => "The description of a database table.",
            Self::ContentType => {
                "The kind of generated summary, e.g., 'sql_summary' or 'python_summary'."
            }
            Self::FunctionName => "The name of a function defined in a source file.",
            Self::ChunkIndex => "Position of a plain-text chunk within its file.",
        }
    }
}

impl std::fmt::Display for MetadataField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat passage metadata. Ordered so serialized output is byte-stable.
pub type Metadata = BTreeMap<MetadataField, String>;

// ---------------------------------------------------------------------------
// Passage
// ---------------------------------------------------------------------------

/// One independently retrievable unit of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub metadata: Metadata,
}

impl Passage {
    /// Create a passage carrying only its `source`.
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(MetadataField::Source, source.into());
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// Builder-style metadata insert.
    #[must_use]
    pub fn with(mut self, field: MetadataField, value: impl Into<String>) -> Self {
        self.metadata.insert(field, value.into());
        self
    }

    pub fn get(&self, field: MetadataField) -> Option<&str> {
        self.metadata.get(&field).map(String::as_str)
    }

    pub fn source(&self) -> &str {
        self.get(MetadataField::Source).unwrap_or_default()
    }

    pub fn doc_id(&self) -> Option<&str> {
        self.get(MetadataField::DocId)
    }

    /// Split into `(text, metadata)` with string keys, the shape the index expects.
    pub fn into_parts(self) -> (String, BTreeMap<String, String>) {
        let metadata = self
            .metadata
            .into_iter()
            .map(|(k, v)| (k.as_str().to_string(), v))
            .collect();
        (self.text, metadata)
    }
}

// ---------------------------------------------------------------------------
// CorpusRecord
// ---------------------------------------------------------------------------

/// Index-facing form of a passage: an id plus text and string-keyed metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub id: String,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

impl CorpusRecord {
    /// Build a record for the passage at `ordinal` within its file's output.
    ///
    /// Ids are scoped by source so equal `doc_id`s in different files never
    /// share a record: `raw:<source>` is kept as is, any other `doc_id`
    /// becomes `<source>#<doc_id>`, and passages without one get
    /// `<source>#<16 hex digits>` derived from the source, ordinal and text.
    /// The `doc_id` metadata value is left untouched.
    pub fn from_passage(passage: Passage, ordinal: usize) -> Self {
        let source = passage.source();
        let id = match passage.doc_id() {
            Some(doc_id) if doc_id.strip_prefix("raw:") == Some(source) => doc_id.to_string(),
            Some(doc_id) => format!("{source}#{doc_id}"),
            None => make_record_id(source, ordinal, &passage.text),
        };
        let (text, metadata) = passage.into_parts();
        Self { id, text, metadata }
    }
}

/// Deterministic fallback id for passages without a `doc_id`.
pub fn make_record_id(source: &str, ordinal: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(ordinal.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{source}#{}", &digest[..16])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(MetadataField::Source, "source")]
    #[test_case(MetadataField::DocId, "doc_id")]
    #[test_case(MetadataField::DagId, "dag_id")]
    #[test_case(MetadataField::TaskName, "task_name")]
    #[test_case(MetadataField::DagDescription, "dag_description")]
    #[test_case(MetadataField::ScriptFile, "script_file")]
    #[test_case(MetadataField::TableDescription, "table_description")]
    #[test_case(MetadataField::ContentType, "content_type")]
    #[test_case(MetadataField::FunctionName, "function_name")]
    fn field_names_are_stable(field: MetadataField, expected: &str) {
        assert_eq!(field.as_str(), expected);
        assert_eq!(field.to_string(), expected);
    }

    #[test]
    fn field_as_str_roundtrips_through_from_str_loose() {
        for field in MetadataField::ALL {
            assert_eq!(MetadataField::from_str_loose(field.as_str()), Some(*field));
        }
        assert_eq!(
            MetadataField::from_str_loose(" Task-Name "),
            Some(MetadataField::TaskName)
        );
        assert_eq!(MetadataField::from_str_loose("nope"), None);
    }

    #[test]
    fn field_serde_matches_as_str() {
        for field in MetadataField::ALL {
            let json = serde_json::to_string(field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
    }

    #[test]
    fn every_field_has_a_description() {
        for field in MetadataField::ALL {
            assert!(!field.description().is_empty(), "{field} lacks a description");
        }
    }

    #[test]
    fn language_names() {
        assert_eq!(Language::Python.as_str(), "python");
        assert_eq!(Language::Python.display_name(), "Python");
        assert_eq!(Language::Python.to_string(), "python");
    }

    #[test]
    fn language_query_source_not_empty() {
        assert!(Language::Python.query_source().contains("@function.name"));
    }

    #[test]
    fn passage_builder_and_accessors() {
        let p = Passage::new("hello", "/repo/a.yaml")
            .with(MetadataField::DocId, "raw:/repo/a.yaml")
            .with(MetadataField::Owner, "me");
        assert_eq!(p.source(), "/repo/a.yaml");
        assert_eq!(p.doc_id(), Some("raw:/repo/a.yaml"));
        assert_eq!(p.get(MetadataField::Owner), Some("me"));
        assert_eq!(p.get(MetadataField::Column), None);
    }

    #[test]
    fn into_parts_uses_string_keys() {
        let (text, meta) = Passage::new("t", "/s")
            .with(MetadataField::ContentType, "sql_summary")
            .into_parts();
        assert_eq!(text, "t");
        assert_eq!(meta.get("source").map(String::as_str), Some("/s"));
        assert_eq!(
            meta.get("content_type").map(String::as_str),
            Some("sql_summary")
        );
    }

    #[test]
    fn record_id_scopes_doc_id_by_source() {
        let p = Passage::new("x", "/s").with(MetadataField::DocId, "dag:task");
        let r = CorpusRecord::from_passage(p, 3);
        assert_eq!(r.id, "/s#dag:task");
        assert_eq!(r.metadata.get("doc_id").map(String::as_str), Some("dag:task"));

        let raw = Passage::new("x", "/s").with(MetadataField::DocId, "raw:/s");
        assert_eq!(CorpusRecord::from_passage(raw, 0).id, "raw:/s");
    }

    #[test]
    fn equal_doc_ids_in_different_files_get_distinct_records() {
        let dev = Passage::new("x", "/dev/job.yaml").with(MetadataField::DocId, "job:t");
        let prod = Passage::new("x", "/prod/job.yaml").with(MetadataField::DocId, "job:t");
        assert_ne!(
            CorpusRecord::from_passage(dev, 2).id,
            CorpusRecord::from_passage(prod, 2).id
        );
    }

    #[test]
    fn record_fallback_id_is_deterministic_and_positional() {
        let a = CorpusRecord::from_passage(Passage::new("x", "/s"), 0);
        let b = CorpusRecord::from_passage(Passage::new("x", "/s"), 0);
        let c = CorpusRecord::from_passage(Passage::new("x", "/s"), 1);
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert!(a.id.starts_with("/s#"));
        assert_eq!(a.id.len(), "/s#".len() + 16);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn field_from_str_loose_never_panics(s in "\\PC{0,40}") {
            let _ = MetadataField::from_str_loose(&s);
        }

        #[test]
        fn record_id_never_panics(source in "\\PC{0,40}", ordinal in 0usize..1000, text in "\\PC{0,80}") {
            let id = make_record_id(&source, ordinal, &text);
            prop_assert!(id.starts_with(&source));
        }
    }
}
