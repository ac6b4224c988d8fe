//! Configuration data structures for repo-corpus.
//!
//! Defines the YAML config format: which extensions are walked, which
//! directories are pruned, chunking sizes for the plain-text fallback, and
//! marker lines stripped from query scripts. Every field has a default, so an
//! empty file (or no file at all) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CorpusError, Result};

/// File name looked up in the repository root by [`CorpusConfig::discover`].
pub const CONFIG_FILE_NAME: &str = ".repo-corpus.yaml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for a corpus build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// File suffixes (with the leading dot) that are walked at all.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Directory names never descended into.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,

    /// Follow symbolic links while walking.
    #[serde(default)]
    pub follow_links: bool,

    /// Extract files on the rayon pool. Output order is unchanged.
    #[serde(default)]
    pub parallel: bool,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub script: ScriptConfig,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            exclude_dirs: default_exclude_dirs(),
            follow_links: false,
            parallel: false,
            chunking: ChunkingConfig::default(),
            script: ScriptConfig::default(),
        }
    }
}

impl CorpusConfig {
    /// Load and validate a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CorpusError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml(&contents)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty document deserializes as null; treat it as "all defaults".
        let config: Self = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(contents)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load `<root>/.repo-corpus.yaml` when it exists, defaults otherwise.
    pub fn discover(root: &Path) -> Result<Self> {
        let candidate = root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(CorpusError::Config("chunking.chunk_size must be > 0".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(CorpusError::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if let Some(bad) = self
            .allowed_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(CorpusError::Config(format!(
                "allowed extension '{bad}' must start with '.'"
            )));
        }
        Ok(())
    }

    /// Case-sensitive suffix check against the allowed set.
    pub fn is_allowed(&self, file_name: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|ext| file_name.ends_with(ext.as_str()))
    }
}

// ---------------------------------------------------------------------------
// ChunkingConfig
// ---------------------------------------------------------------------------

/// Window sizes for the generic chunker, in characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptConfig
// ---------------------------------------------------------------------------

/// Query-script preprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Whole-line tool markers removed before anything else.
    #[serde(default = "default_strip_markers")]
    pub strip_markers: Vec<String>,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            strip_markers: default_strip_markers(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_allowed_extensions() -> Vec<String> {
    [".py", ".sql", ".md", ".json", ".yaml", ".yml"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_exclude_dirs() -> Vec<String> {
    [".git", "node_modules", "__pycache__", ".venv", "target"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_strip_markers() -> Vec<String> {
    vec!["-- Databricks notebook source".to_string()]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
