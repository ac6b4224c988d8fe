//! Repository traversal.
//!
//! Walks a root directory in sorted order, prunes excluded directories,
//! routes every file through the [`Dispatcher`] and collects per-file
//! results. Files are independent, so extraction can run on the rayon pool;
//! results are collected back in walk order either way.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use walkdir::{DirEntry, WalkDir};

use super::dispatch::{Dispatcher, ExtractorKind};
use crate::config::CorpusConfig;
use crate::error::{CorpusError, ExtractIssue, Result};
use crate::extractors::Extraction;
use crate::observability::WalkStats;
use crate::types::{CorpusRecord, Passage};

/// Output of one extracted file.
#[derive(Debug)]
pub struct FileExtraction {
    pub path: PathBuf,
    pub kind: ExtractorKind,
    pub extraction: Extraction,
}

impl FileExtraction {
    /// Index records for this file's passages, ids derived per position.
    pub fn records(&self) -> impl Iterator<Item = CorpusRecord> + '_ {
        self.extraction
            .passages
            .iter()
            .enumerate()
            .map(|(ordinal, passage)| CorpusRecord::from_passage(passage.clone(), ordinal))
    }
}

/// Everything a walk produced, in walk order.
#[derive(Debug)]
pub struct WalkReport {
    pub root: PathBuf,
    pub files: Vec<FileExtraction>,
    pub stats: WalkStats,
}

impl WalkReport {
    /// All passages, file by file.
    pub fn passages(&self) -> impl Iterator<Item = &Passage> {
        self.files.iter().flat_map(|f| f.extraction.passages.iter())
    }

    /// All reported issues, file by file.
    pub fn issues(&self) -> impl Iterator<Item = &ExtractIssue> {
        self.files.iter().flat_map(|f| f.extraction.issues.iter())
    }

    /// All passages converted to index records.
    pub fn records(&self) -> impl Iterator<Item = CorpusRecord> + '_ {
        self.files.iter().flat_map(FileExtraction::records)
    }
}

/// Files selected for extraction, before any of them is read.
#[derive(Debug)]
pub struct Discovery {
    /// Canonicalized walk root.
    pub root: PathBuf,
    /// Selected files with their strategy, in walk order.
    pub files: Vec<(PathBuf, ExtractorKind)>,
    pub stats: WalkStats,
}

/// Walks a repository and extracts every allowed file.
#[derive(Debug, Clone)]
pub struct RepositoryWalker {
    config: CorpusConfig,
    dispatcher: Dispatcher,
}

impl RepositoryWalker {
    pub fn new(config: CorpusConfig) -> Self {
        let dispatcher = Dispatcher::new(&config);
        Self { config, dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// List the files a walk would extract without extracting them.
    pub fn discover(&self, root: &Path) -> Result<Discovery> {
        let root = root
            .canonicalize()
            .map_err(|_| CorpusError::RootNotFound(root.to_path_buf()))?;

        let mut stats = WalkStats::new();
        let mut selected = Vec::new();

        let walker = WalkDir::new(&root)
            .follow_links(self.config.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded_dir(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            stats.files_seen += 1;

            let path = entry.into_path();
            match self.dispatcher.select(&path) {
                Some(kind) => selected.push((path, kind)),
                None => {
                    stats.files_skipped += 1;
                    tracing::debug!(path = %path.display(), "not an allowed extension");
                }
            }
        }
        Ok(Discovery {
            root,
            files: selected,
            stats,
        })
    }

    /// Walk `root` and extract every allowed file.
    ///
    /// Fails only when the root itself cannot be resolved. Per-file problems
    /// are carried in each [`FileExtraction`].
    pub fn walk(&self, root: &Path) -> Result<WalkReport> {
        let start = Instant::now();
        let Discovery {
            root,
            files: selected,
            mut stats,
        } = self.discover(root)?;

        let extract = |(path, kind): &(PathBuf, ExtractorKind)| FileExtraction {
            extraction: self.dispatcher.extractor(*kind).process(path),
            path: path.clone(),
            kind: *kind,
        };
        let files: Vec<FileExtraction> = if self.config.parallel {
            selected.par_iter().map(extract).collect()
        } else {
            selected.iter().map(extract).collect()
        };

        for file in &files {
            stats.files_extracted += 1;
            stats.passages += file.extraction.passages.len();
            stats.issues += file.extraction.issues.len();
            if file.extraction.is_empty() {
                stats.files_empty += 1;
            }
        }
        stats.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            root = %root.display(),
            files = stats.files_extracted,
            skipped = stats.files_skipped,
            issues = stats.issues,
            duration_ms = stats.duration_ms,
            "Found and processed {} passages",
            stats.passages
        );

        Ok(WalkReport { root, files, stats })
    }

    fn is_excluded_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.config.exclude_dirs.iter().any(|d| d == name))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
