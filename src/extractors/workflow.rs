//! Workflow-definition (DAG YAML) extraction.
//!
//! A file is a multi-document YAML stream. Every readable file yields its raw
//! passage first. Each sub-document carrying a `dag` mapping then yields one
//! summary passage and one passage per task, with upstream/downstream clauses
//! resolved from the sub-document's `execution` chains.

use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;

use super::dependencies::TaskDependencies;
use super::{raw_passage, read_source, source_of, DocIds, Extraction, Extractor};
use crate::error::ExtractIssue;
use crate::types::{MetadataField, Passage};

const NOT_AVAILABLE: &str = "N/A";
const NO_DESCRIPTION: &str = "No description provided.";
const UNKNOWN_OPERATOR: &str = "unknown";
const NO_SCRIPT: &str = "not specified";

/// Suffix of the per-DAG summary `doc_id`.
pub const DAG_SUMMARY_ID: &str = "__DAG_SUMMARY__";

/// Extractor for orchestrated workflow definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowExtractor;

impl WorkflowExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract passages from already-loaded YAML text.
    pub fn extract(&self, source: &str, content: &str) -> Extraction {
        let mut extraction = Extraction::new();
        extraction.push(raw_passage(source, content));

        let mut ids = DocIds::new();
        // Most recent failed sub-document, reported once the next one is seen.
        let mut failed: Option<Failure> = None;
        for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
            let parsed = Value::deserialize(document).and_then(|mut value| {
                value.apply_merge()?;
                Ok(value)
            });
            let value = match parsed {
                Ok(value) => value,
                Err(e) => {
                    let failure = Failure {
                        index,
                        offset: e.location().map(|at| at.index()),
                        message: e.to_string(),
                    };
                    // Scanner errors are sticky: every following document
                    // repeats the same error, so the stream ends here.
                    if failed.as_ref().is_some_and(|previous| previous.repeats(&failure)) {
                        break;
                    }
                    if let Some(previous) = failed.replace(failure) {
                        extraction.report(previous.into_issue(source));
                    }
                    continue;
                }
            };
            if let Some(previous) = failed.take() {
                extraction.report(previous.into_issue(source));
            }

            let Some(dag) = value.get("dag") else {
                continue;
            };
            match WorkflowDoc::from_value(dag, &value) {
                Ok(doc) => doc.render(source, &mut ids, &mut extraction),
                Err(message) => extraction.report(sub_document_issue(source, index, message)),
            }
        }

        if let Some(last) = failed {
            extraction.report(if last.index == 0 {
                ExtractIssue::Malformed {
                    path: source.to_string(),
                    format: "YAML",
                    message: last.message,
                }
            } else {
                last.into_issue(source)
            });
        }
        extraction
    }
}

impl Extractor for WorkflowExtractor {
    fn name(&self) -> &'static str {
        "workflow"
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
// Sub-document model
// ---------------------------------------------------------------------------

/// One DAG sub-document with every default already applied.
#[derive(Debug)]
struct WorkflowDoc {
    dag_id: String,
    owner: String,
    schedule: String,
    description: String,
    tasks: Vec<TaskDoc>,
    dependencies: TaskDependencies,
}

#[derive(Debug)]
struct TaskDoc {
    name: String,
    operator: String,
    script: Option<String>,
}

impl WorkflowDoc {
    /// Validate the shape of one sub-document. Missing fields get defaults;
    /// only a wrongly-typed `dag` or `tasks` value is an error.
    fn from_value(dag: &Value, document: &Value) -> Result<Self, String> {
        if !dag.is_mapping() && !dag.is_null() {
            return Err(format!("'dag' must be a mapping, found {}", kind_of(dag)));
        }

        let dag_id = lookup(dag, &["dag_id"]).unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let owner =
            lookup(dag, &["default_args", "owner"]).unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let schedule =
            lookup(dag, &["schedule_interval"]).unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let description =
            lookup(dag, &["description"]).unwrap_or_else(|| NO_DESCRIPTION.to_string());

        let tasks = match document.get("tasks") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Mapping(tasks)) => tasks
                .iter()
                .filter_map(|(name, details)| {
                    let name = scalar_text(name)?;
                    Some(TaskDoc {
                        operator: lookup(details, &["operator"])
                            .unwrap_or_else(|| UNKNOWN_OPERATOR.to_string()),
                        script: lookup(details, &["file"]),
                        name,
                    })
                })
                .collect(),
            Some(other) => {
                return Err(format!("'tasks' must be a mapping, found {}", kind_of(other)));
            }
        };

        let chains: Vec<String> = match document.get("execution") {
            Some(Value::Sequence(items)) => items.iter().filter_map(scalar_text).collect(),
            Some(single) => scalar_text(single).into_iter().collect(),
            None => Vec::new(),
        };

        Ok(Self {
            dag_id,
            owner,
            schedule,
            description,
            tasks,
            dependencies: TaskDependencies::from_chains(&chains),
        })
    }

    fn render(&self, source: &str, ids: &mut DocIds, extraction: &mut Extraction) {
        let summary = format!(
            "This document describes the DAG configuration with ID '{}'. \
             The owner is '{}', it runs on schedule: '{}', \
             and its description is: '{}'.",
            self.dag_id, self.owner, self.schedule, self.description
        );
        extraction.push(
            Passage::new(summary, source)
                .with(
                    MetadataField::DocId,
                    ids.claim(format!("{}:{DAG_SUMMARY_ID}", self.dag_id)),
                )
                .with(MetadataField::DagId, &self.dag_id)
                .with(MetadataField::Owner, &self.owner)
                .with(MetadataField::Schedule, &self.schedule)
                .with(MetadataField::DagDescription, &self.description),
        );

        for task in &self.tasks {
            let mut text = format!(
                "The DAG '{}' contains a task named '{}'. \
                 This task uses the '{}' operator and runs the script '{}'.",
                self.dag_id,
                task.name,
                task.operator,
                task.script.as_deref().unwrap_or(NO_SCRIPT)
            );
            if let Some(ups) = self.dependencies.upstream_of(&task.name) {
                text.push_str(&format!(
                    " It runs after the following task(s): {}.",
                    ups.join(", ")
                ));
            }
            if let Some(downs) = self.dependencies.downstream_of(&task.name) {
                text.push_str(&format!(
                    " It runs before the following task(s): {}.",
                    downs.join(", ")
                ));
            }

            let mut passage = Passage::new(text, source)
                .with(
                    MetadataField::DocId,
                    ids.claim(format!("{}:{}", self.dag_id, task.name)),
                )
                .with(MetadataField::DagId, &self.dag_id)
                .with(MetadataField::Owner, &self.owner)
                .with(MetadataField::Schedule, &self.schedule)
                .with(MetadataField::TaskName, &task.name)
                .with(MetadataField::Operator, &task.operator);
            if let Some(script) = &task.script {
                passage = passage.with(MetadataField::ScriptFile, script);
            }
            extraction.push(passage);
        }
    }
}

// ---------------------------------------------------------------------------
// YAML helpers
// ---------------------------------------------------------------------------

/// A sub-document that failed to load.
#[derive(Debug)]
struct Failure {
    index: usize,
    offset: Option<usize>,
    message: String,
}

impl Failure {
    fn repeats(&self, next: &Failure) -> bool {
        self.offset == next.offset && self.message == next.message
    }

    fn into_issue(self, source: &str) -> ExtractIssue {
        sub_document_issue(source, self.index, self.message)
    }
}

fn sub_document_issue(source: &str, index: usize, message: String) -> ExtractIssue {
    ExtractIssue::SubDocument {
        path: source.to_string(),
        index,
        message,
    }
}

/// Follow a key path through nested mappings and render the leaf as text.
fn lookup(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    scalar_text(current)
}

/// Plain text of a YAML value. `null` is absent.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => serde_yaml::to_string(value)
            .ok()
            .map(|s| s.trim_end().to_string()),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
