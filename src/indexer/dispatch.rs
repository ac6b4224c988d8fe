//! Extension-based routing of files to extractors.
//!
//! Routing is a pure function of the file name and the allowed-extension
//! set: a static suffix table picks the specialized extractor, allowed files
//! without one go to the generic chunker, everything else is skipped.

use std::path::Path;

use crate::config::CorpusConfig;
use crate::extractors::{
    CodeExtractor, Extraction, Extractor, SchemaExtractor, ScriptExtractor, TextChunker,
    WorkflowExtractor,
};
use crate::types::Language;

/// The closed set of handling strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractorKind {
    Workflow,
    Schema,
    Script,
    Code(Language),
    Chunk,
}

/// Suffix → specialized extractor. Matching is case-sensitive.
pub const DISPATCH_TABLE: &[(&str, ExtractorKind)] = &[
    (".yaml", ExtractorKind::Workflow),
    (".yml", ExtractorKind::Workflow),
    (".json", ExtractorKind::Schema),
    (".sql", ExtractorKind::Script),
    (".py", ExtractorKind::Code(Language::Python)),
];

impl ExtractorKind {
    /// Specialized extractor registered for a file name's suffix.
    pub fn for_file_name(file_name: &str) -> Option<(&'static str, Self)> {
        DISPATCH_TABLE
            .iter()
            .find(|(suffix, _)| file_name.ends_with(suffix))
            .copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workflow => "workflow",
            Self::Schema => "schema",
            Self::Script => "script",
            Self::Code(_) => "code",
            Self::Chunk => "chunk",
        }
    }
}

impl std::fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code(language) => write!(f, "code:{language}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Read-only dispatch table plus one instance of every extractor.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: CorpusConfig,
    workflow: WorkflowExtractor,
    schema: SchemaExtractor,
    script: ScriptExtractor,
    python: CodeExtractor,
    chunker: TextChunker,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(&CorpusConfig::default())
    }
}

impl Dispatcher {
    pub fn new(config: &CorpusConfig) -> Self {
        Self {
            config: config.clone(),
            workflow: WorkflowExtractor::new(),
            schema: SchemaExtractor::new(),
            script: ScriptExtractor::from_config(&config.script),
            python: CodeExtractor::new(Language::Python),
            chunker: TextChunker::from_config(&config.chunking),
        }
    }

    /// Pick the handling strategy for `path`, or `None` to skip it.
    ///
    /// A specialized extractor applies only when its own suffix is in the
    /// allowed set; other allowed files fall back to the chunker.
    pub fn select(&self, path: &Path) -> Option<ExtractorKind> {
        let file_name = path.file_name()?.to_str()?;
        if !self.config.is_allowed(file_name) {
            return None;
        }
        match ExtractorKind::for_file_name(file_name) {
            Some((suffix, kind)) if self.config.allowed_extensions.iter().any(|e| e == suffix) => {
                Some(kind)
            }
            _ => Some(ExtractorKind::Chunk),
        }
    }

    /// The extractor instance behind a strategy.
    pub fn extractor(&self, kind: ExtractorKind) -> &dyn Extractor {
        match kind {
            ExtractorKind::Workflow => &self.workflow,
            ExtractorKind::Schema => &self.schema,
            ExtractorKind::Script => &self.script,
            ExtractorKind::Code(Language::Python) => &self.python,
            ExtractorKind::Chunk => &self.chunker,
        }
    }

    /// Route one file. `None` means the file is not in the allowed set.
    pub fn process(&self, path: &Path) -> Option<(ExtractorKind, Extraction)> {
        let kind = self.select(path)?;
        Some((kind, self.extractor(kind).process(path)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use test_case::test_case;

    #[test_case("dags/load.yaml", Some(ExtractorKind::Workflow))]
    #[test_case("dags/load.yml", Some(ExtractorKind::Workflow))]
    #[test_case("dict/orders.json", Some(ExtractorKind::Schema))]
    #[test_case("sql/report.sql", Some(ExtractorKind::Script))]
    #[test_case("src/job.py", Some(ExtractorKind::Code(Language::Python)))]
    #[test_case("README.md", Some(ExtractorKind::Chunk) ; "allowed_without_extractor")]
    #[test_case("image.png", None ; "not_allowed")]
    #[test_case("QUERY.SQL", None ; "suffix_is_case_sensitive")]
    #[test_case("Makefile", None ; "no_extension")]
    fn default_routing(path: &str, expected: Option<ExtractorKind>) {
        assert_eq!(Dispatcher::default().select(Path::new(path)), expected);
    }

    #[test]
    fn specialized_extension_outside_allowed_set_is_skipped() {
        let config = CorpusConfig {
            allowed_extensions: vec![".md".into()],
            ..CorpusConfig::default()
        };
        let dispatcher = Dispatcher::new(&config);
        assert_eq!(dispatcher.select(Path::new("a.yaml")), None);
        assert_eq!(
            dispatcher.select(Path::new("a.md")),
            Some(ExtractorKind::Chunk)
        );
    }

    #[test]
    fn allowed_compound_suffix_without_table_entry_is_chunked() {
        let config = CorpusConfig {
            allowed_extensions: vec![".sql.j2".into()],
            ..CorpusConfig::default()
        };
        let dispatcher = Dispatcher::new(&config);
        assert_eq!(
            dispatcher.select(Path::new("model.sql.j2")),
            Some(ExtractorKind::Chunk)
        );
    }

    #[test]
    fn process_delegates_to_selected_extractor() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("report.sql");
        std::fs::write(&path, "SELECT * FROM sales.orders").unwrap();

        let (kind, out) = Dispatcher::default().process(&path).unwrap();
        assert_eq!(kind, ExtractorKind::Script);
        assert_eq!(out.passages.len(), 2);
        assert!(Dispatcher::default()
            .process(&tmp.path().join("x.bin"))
            .is_none());
    }

    #[test]
    fn extractor_names_match_kinds() {
        let dispatcher = Dispatcher::default();
        for (_, kind) in DISPATCH_TABLE {
            assert_eq!(dispatcher.extractor(*kind).name(), kind.as_str());
        }
        assert_eq!(dispatcher.extractor(ExtractorKind::Chunk).name(), "chunk");
        assert_eq!(
            ExtractorKind::Code(Language::Python).to_string(),
            "code:python"
        );
    }
}
