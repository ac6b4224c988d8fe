//! YAML configuration for corpus builds.

pub mod schema;

pub use schema::{ChunkingConfig, CorpusConfig, ScriptConfig, CONFIG_FILE_NAME};
