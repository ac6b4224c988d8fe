//! End-to-end tests for repo-corpus.
//!
//! These tests write real files into temporary directories, push them through
//! the dispatcher or the repository walker, and check the passages and
//! records that come out the other end.

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use repo_corpus::config::CorpusConfig;
use repo_corpus::error::ExtractIssue;
use repo_corpus::extractors::{Extractor, WorkflowExtractor};
use repo_corpus::indexer::sink::write_all;
use repo_corpus::indexer::{Dispatcher, ExtractorKind, JsonLinesSink, RepositoryWalker};
use repo_corpus::types::{CorpusRecord, MetadataField};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn setup(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let full_path = dir.path().join(path);
        std::fs::create_dir_all(full_path.parent().unwrap()).unwrap();
        std::fs::write(&full_path, content).unwrap();
    }
    dir
}

fn dispatch(path: &Path) -> (ExtractorKind, repo_corpus::extractors::Extraction) {
    Dispatcher::new(&CorpusConfig::default())
        .process(path)
        .expect("allowed extension")
}

fn texts(extraction: &repo_corpus::extractors::Extraction) -> Vec<&str> {
    extraction.passages.iter().map(|p| p.text.as_str()).collect()
}

const REPORT_DAG: &str = r#"
dag:
  dag_id: daily_report
  default_args:
    owner: analytics
  schedule_interval: "0 6 * * *"
  description: Builds the daily report.
tasks:
  start_task:
    operator: DummyOperator
  process_data:
    operator: PythonOperator
    file: scripts/process.py
  send_report:
    operator: EmailOperator
execution:
  - start_task >> process_data >> send_report
"#;

// ===========================================================================
// 1. Workflow definitions
// ===========================================================================

#[test]
fn workflow_chain_resolves_upstream_and_downstream() {
    let dir = setup(&[("dags/report.yaml", REPORT_DAG)]);
    let (kind, extraction) = dispatch(&dir.path().join("dags/report.yaml"));

    assert_eq!(kind, ExtractorKind::Workflow);
    assert_eq!(extraction.passages.len(), 5);
    assert!(extraction.issues.is_empty());
    assert_eq!(extraction.passages[0].text, REPORT_DAG);

    let process = extraction
        .passages
        .iter()
        .find(|p| p.get(MetadataField::TaskName) == Some("process_data"))
        .unwrap();
    assert!(process.text.contains("runs after the following task(s): start_task"));
    assert!(process.text.contains("runs before the following task(s): send_report"));
    assert_eq!(process.get(MetadataField::DagId), Some("daily_report"));
    assert_eq!(process.get(MetadataField::Operator), Some("PythonOperator"));
    assert_eq!(process.doc_id(), Some("daily_report:process_data"));
    assert_eq!(
        process.get(MetadataField::ScriptFile),
        Some("scripts/process.py")
    );

    let summary = &extraction.passages[1];
    assert_eq!(summary.doc_id(), Some("daily_report:__DAG_SUMMARY__"));
    assert_eq!(summary.get(MetadataField::Owner), Some("analytics"));
}

#[test]
fn workflow_sub_documents_are_independent() {
    let content = "\
dag: {dag_id: dag_alpha}
tasks: {a1: {}, a2: {}}
execution: [a1 >> a2]
---
dag: {dag_id: dag_beta}
tasks: {b1: {}, b2: {}}
execution: [b1 >> b2]
";
    let dir = setup(&[("multi.yml", content)]);
    let (_, extraction) = dispatch(&dir.path().join("multi.yml"));

    assert_eq!(extraction.passages.len(), 7);
    let dags: Vec<_> = extraction.passages[1..]
        .iter()
        .map(|p| p.get(MetadataField::DagId).unwrap())
        .collect();
    assert_eq!(
        dags,
        vec!["dag_alpha", "dag_alpha", "dag_alpha", "dag_beta", "dag_beta", "dag_beta"]
    );

    let b1 = extraction
        .passages
        .iter()
        .find(|p| p.get(MetadataField::TaskName) == Some("b1"))
        .unwrap();
    assert!(b1.text.contains("runs before the following task(s): b2"));
    assert!(!b1.text.contains("a2"));
}

#[test]
fn workflow_without_dag_key_yields_raw_only() {
    let dir = setup(&[("config.yaml", "settings:\n  retries: 3\n")]);
    let (kind, extraction) = dispatch(&dir.path().join("config.yaml"));
    assert_eq!(kind, ExtractorKind::Workflow);
    assert_eq!(texts(&extraction), vec!["settings:\n  retries: 3\n"]);
    assert!(extraction.issues.is_empty());
}

#[test]
fn unreadable_workflow_yields_nothing_and_reports() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("gone.yaml");
    let extraction = WorkflowExtractor::new().process(&missing);

    assert!(extraction.passages.is_empty());
    assert_eq!(extraction.issues.len(), 1);
    assert!(matches!(extraction.issues[0], ExtractIssue::Unreadable { .. }));
    assert!(extraction.issues[0].path().ends_with("gone.yaml"));
}

#[test]
fn invalid_yaml_keeps_raw_passage() {
    let dir = setup(&[("broken.yaml", "dag: [unclosed\n")]);
    let (_, extraction) = dispatch(&dir.path().join("broken.yaml"));
    assert_eq!(texts(&extraction), vec!["dag: [unclosed\n"]);
    assert!(matches!(
        extraction.issues[0],
        ExtractIssue::Malformed { format: "YAML", .. }
    ));
}

// ===========================================================================
// 2. Data dictionaries
// ===========================================================================

#[test]
fn data_dictionary_mentions_classification_only_when_tagged() {
    let content = r#"{
  "schema": "sales",
  "table": "orders",
  "table_description": "One row per order",
  "column_types": {
    "order_id": {"column_type": "bigint", "description": "Order key"},
    "customer_email": {
      "column_type": "string",
      "description": "Buyer email",
      "pii_confidentiality_impact_level": "high"
    }
  }
}"#;
    let dir = setup(&[("dict/orders.json", content)]);
    let (kind, extraction) = dispatch(&dir.path().join("dict/orders.json"));

    assert_eq!(kind, ExtractorKind::Schema);
    assert_eq!(extraction.passages.len(), 4);

    let summary = &extraction.passages[1];
    assert_eq!(summary.doc_id(), Some("sales.orders:__TABLE_SUMMARY__"));
    assert_eq!(summary.get(MetadataField::Table), Some("sales.orders"));

    let order_id = &extraction.passages[2];
    let email = &extraction.passages[3];
    assert_eq!(order_id.get(MetadataField::Column), Some("order_id"));
    assert_eq!(email.get(MetadataField::Column), Some("customer_email"));
    assert!(!order_id.text.contains("PII"));
    assert!(email.text.contains("'high'"));
}

#[test]
fn invalid_json_reports_and_keeps_raw() {
    let dir = setup(&[("bad.json", "{\"schema\": ")]);
    let (_, extraction) = dispatch(&dir.path().join("bad.json"));
    assert_eq!(extraction.passages.len(), 1);
    assert!(matches!(
        extraction.issues[0],
        ExtractIssue::Malformed { format: "JSON", .. }
    ));
}

// ===========================================================================
// 3. SQL scripts
// ===========================================================================

#[test]
fn view_script_lists_joined_tables() {
    let content = "CREATE VIEW v AS SELECT * FROM t1 JOIN t2 ON t1.id = t2.id;";
    let dir = setup(&[("sql/v.sql", content)]);
    let (kind, extraction) = dispatch(&dir.path().join("sql/v.sql"));

    assert_eq!(kind, ExtractorKind::Script);
    assert_eq!(extraction.passages.len(), 2);
    assert_eq!(extraction.passages[0].text, content);
    let summary = &extraction.passages[1].text;
    assert!(summary.contains("t1"), "{summary}");
    assert!(summary.contains("t2"), "{summary}");
    assert_eq!(
        extraction.passages[1].get(MetadataField::ContentType),
        Some("sql_summary")
    );
}

// ===========================================================================
// 4. Python sources
// ===========================================================================

#[test]
fn python_file_yields_imports_and_functions() {
    let content = r#"import os
from collections import OrderedDict

def load(path):
    """Load a file."""
    return open(path).read()

async def fetch():
    pass
"#;
    let dir = setup(&[("pkg/io.py", content)]);
    let (kind, extraction) = dispatch(&dir.path().join("pkg/io.py"));

    assert_eq!(kind, ExtractorKind::Code(repo_corpus::Language::Python));
    assert_eq!(
        &texts(&extraction)[1..],
        &[
            "This Python script imports the following libraries: collections, os.",
            "Function 'load': Load a file.",
            "Function 'fetch': No docstring provided.",
        ]
    );
    assert_eq!(
        extraction.passages[2].get(MetadataField::FunctionName),
        Some("load")
    );
}

// ===========================================================================
// 5. Walker, dispatcher, sink
// ===========================================================================

#[test]
fn walk_then_sink_produces_one_line_per_record() {
    let dir = setup(&[
        ("dags/report.yaml", REPORT_DAG),
        ("README.md", "# Project\n\nShort readme."),
        ("sql/load.sql", "SELECT a FROM raw.events"),
        ("target/debug/ignored.sql", "SELECT 1"),
        ("logo.png", "binary"),
    ]);
    let report = RepositoryWalker::new(CorpusConfig::default())
        .walk(dir.path())
        .unwrap();

    let files: Vec<PathBuf> = report
        .files
        .iter()
        .map(|f| f.path.strip_prefix(&report.root).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        files,
        vec![
            PathBuf::from("README.md"),
            PathBuf::from("dags/report.yaml"),
            PathBuf::from("sql/load.sql"),
        ]
    );

    let mut sink = JsonLinesSink::new(Vec::new());
    let written = write_all(&mut sink, report.records()).unwrap();
    assert_eq!(written, 1 + 5 + 2);

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let records: Vec<CorpusRecord> = out
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), written);
    let send = records
        .iter()
        .find(|r| r.metadata.get("doc_id").map(String::as_str) == Some("daily_report:send_report"))
        .unwrap();
    assert!(send.id.ends_with("report.yaml#daily_report:send_report"));
    assert!(records
        .iter()
        .all(|r| r.metadata.contains_key("source")));
}

#[test]
fn narrowed_allowed_set_routes_to_chunker() {
    let config = CorpusConfig {
        allowed_extensions: vec![".txt".to_string(), ".yaml.txt".to_string()],
        ..CorpusConfig::default()
    };
    let dir = setup(&[("notes.yaml.txt", "dag:\n  dag_id: looks_like_a_dag\n")]);
    let dispatcher = Dispatcher::new(&config);
    let path = dir.path().join("notes.yaml.txt");

    let (kind, extraction) = dispatcher.process(&path).unwrap();
    assert_eq!(kind, ExtractorKind::Chunk);
    assert_eq!(extraction.passages.len(), 1);
    assert_eq!(
        extraction.passages[0].get(MetadataField::ChunkIndex),
        Some("0")
    );
    assert!(dispatcher.process(&dir.path().join("other.yaml")).is_none());
}

#[test]
fn config_file_at_root_is_discovered() {
    let dir = setup(&[
        (".repo-corpus.yaml", "allowed_extensions: [\".sql\"]\n"),
        ("a.sql", "SELECT * FROM t"),
        ("b.md", "ignored"),
    ]);
    let config = CorpusConfig::discover(dir.path()).unwrap();
    let report = RepositoryWalker::new(config).walk(dir.path()).unwrap();
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].kind, ExtractorKind::Script);
    assert_eq!(report.stats.files_skipped, 2);
}
