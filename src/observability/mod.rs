//! Structured logging and walk statistics.
//!
//! - [`init_logging`]: one-time tracing setup with `RUST_LOG` support
//! - [`WalkStats`]: counters accumulated by the repository walker

use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Initialize structured logging with `RUST_LOG` environment variable support.
///
/// Defaults to `repo_corpus=info` when `RUST_LOG` is not set. Output goes to
/// stderr so stdout stays free for JSON lines. Subsequent calls are ignored.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("repo_corpus=info"));

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Counters for one repository walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    /// Regular files seen under the root (after directory pruning).
    pub files_seen: usize,
    /// Files handed to an extractor.
    pub files_extracted: usize,
    /// Files silently excluded by the allowed-extension filter.
    pub files_skipped: usize,
    /// Extracted files that produced no passages at all.
    pub files_empty: usize,
    pub passages: usize,
    /// Reported per-file issues.
    pub issues: usize,
    pub duration_ms: u64,
}

impl WalkStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_does_not_panic() {
        init_logging();
        // Second call should also not panic (try_init ignores re-init).
        init_logging();
    }

    #[test]
    fn stats_start_at_zero() {
        let stats = WalkStats::new();
        assert_eq!(stats.files_seen, 0);
        assert_eq!(stats.passages, 0);
    }

    #[test]
    fn stats_to_json_has_all_counters() {
        let stats = WalkStats {
            files_seen: 4,
            files_extracted: 3,
            files_skipped: 1,
            files_empty: 0,
            passages: 9,
            issues: 2,
            duration_ms: 12,
        };
        let json = stats.to_json();
        assert_eq!(json["files_seen"], 4);
        assert_eq!(json["passages"], 9);
        assert_eq!(json["issues"], 2);
        assert_eq!(json["duration_ms"], 12);
        assert_eq!(json.as_object().map(|o| o.len()), Some(7));
    }
}
