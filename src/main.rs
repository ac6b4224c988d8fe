//! # repo-corpus CLI
//!
//! ```bash
//! # Every passage of a repository as JSON lines
//! repo-corpus walk ./my-repo > corpus.jsonl
//!
//! # One file through the dispatcher
//! repo-corpus extract ./my-repo/dags/seller.yaml
//!
//! # Metadata field catalog for the query-construction side
//! repo-corpus fields
//! repo-corpus fields task_name
//! ```
//!
//! Records go to stdout, logs to stderr (`RUST_LOG` controls verbosity).

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use repo_corpus::config::CorpusConfig;
use repo_corpus::error::{CorpusError, Result};
use repo_corpus::indexer::sink::write_all;
use repo_corpus::indexer::{Dispatcher, JsonLinesSink, RepositoryWalker};
use repo_corpus::observability::init_logging;
use repo_corpus::types::{CorpusRecord, MetadataField};

#[derive(Parser)]
#[command(
    name = "repo-corpus",
    version,
    about = "Extract retrievable passages from workflow, schema, SQL and source files"
)]
struct Cli {
    /// YAML config file. Defaults to `<root>/.repo-corpus.yaml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a repository and print every record as a JSON line.
    Walk {
        /// Repository root.
        root: PathBuf,

        /// Extract files in parallel (output order is unchanged).
        #[arg(long)]
        parallel: bool,

        /// Print walk statistics as JSON to stderr when done.
        #[arg(long)]
        stats: bool,
    },

    /// Extract a single file and print its records as JSON lines.
    Extract {
        file: PathBuf,
    },

    /// Print the metadata field catalog as JSON.
    Fields {
        /// Only this field (case and `-`/`_` insensitive).
        name: Option<String>,
    },
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Walk {
            root,
            parallel,
            stats,
        } => {
            let mut config = load_config(cli.config.as_deref(), Some(&root))?;
            config.parallel |= parallel;
            let report = RepositoryWalker::new(config).walk(&root)?;

            let mut sink = JsonLinesSink::new(BufWriter::new(std::io::stdout().lock()));
            write_all(&mut sink, report.records())?;
            if stats {
                eprintln!("{}", report.stats.to_json());
            }
            Ok(())
        }
        Commands::Extract { file } => {
            let config = load_config(cli.config.as_deref(), None)?;
            let (kind, extraction) = Dispatcher::new(&config).process(&file).ok_or_else(|| {
                CorpusError::Other(format!(
                    "{} does not have an allowed extension",
                    file.display()
                ))
            })?;
            tracing::debug!(path = %file.display(), %kind, "extracted");

            let records = extraction
                .passages
                .into_iter()
                .enumerate()
                .map(|(ordinal, passage)| CorpusRecord::from_passage(passage, ordinal));
            let mut sink = JsonLinesSink::new(BufWriter::new(std::io::stdout().lock()));
            write_all(&mut sink, records)?;
            Ok(())
        }
        Commands::Fields { name } => {
            let selected = match name.as_deref() {
                Some(name) => vec![MetadataField::from_str_loose(name).ok_or_else(|| {
                    CorpusError::Other(format!("unknown metadata field '{name}'"))
                })?],
                None => MetadataField::ALL.to_vec(),
            };
            let catalog: Vec<serde_json::Value> = selected
                .iter()
                .map(|field| {
                    serde_json::json!({
                        "name": field.as_str(),
                        "description": field.description(),
                    })
                })
                .collect();
            let mut out = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut out, &catalog)?;
            writeln!(out)?;
            Ok(())
        }
    }
}

/// Explicit `--config` wins; otherwise look next to the walk root.
fn load_config(explicit: Option<&Path>, root: Option<&Path>) -> Result<CorpusConfig> {
    match (explicit, root) {
        (Some(path), _) => CorpusConfig::load(path),
        (None, Some(root)) if root.is_dir() => CorpusConfig::discover(root),
        _ => Ok(CorpusConfig::default()),
    }
}
