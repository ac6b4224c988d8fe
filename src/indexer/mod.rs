//! Corpus pipeline: walk a repository, route files to extractors, and hand
//! the resulting records to a sink.

pub mod dispatch;
pub mod parser;
pub mod sink;
pub mod walker;

pub use dispatch::{Dispatcher, ExtractorKind};
pub use parser::CodeParser;
pub use sink::{CorpusSink, JsonLinesSink};
pub use walker::{Discovery, FileExtraction, RepositoryWalker, WalkReport};
