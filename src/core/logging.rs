//! Tracing setup: console output plus a daily rolling file under the log directory.

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

pub const LOG_FILE_PREFIX: &str = "docqa.log";

/// Checked before `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "DOCQA_LOG";

const DEFAULT_DIRECTIVES: &str = "info,docqa_backend=info,tower_http=info,sqlx=warn,lopdf=warn,pdf_extract=error";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Filter directives: `DOCQA_LOG`, then `RUST_LOG`, then the built-in set.
/// Blank values count as unset.
pub fn filter_directives(docqa_log: Option<&str>, rust_log: Option<&str>) -> String {
    [docqa_log, rust_log]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(DEFAULT_DIRECTIVES)
        .to_string()
}

fn build_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|e| {
        eprintln!("Invalid log filter {:?} ({}); using defaults", directives, e);
        EnvFilter::new(DEFAULT_DIRECTIVES)
    })
}

/// Installs the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init(paths: &AppPaths) {
    let directives = filter_directives(
        std::env::var(LOG_FILTER_ENV).ok().as_deref(),
        std::env::var("RUST_LOG").ok().as_deref(),
    );

    let console = tracing_subscriber::fmt::layer().with_target(false);
    let file = file_writer(&paths.log_dir).map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
    });

    let installed = tracing_subscriber::registry()
        .with(build_filter(&directives))
        .with(console)
        .with(file)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Logging to {} with filter {}", paths.log_dir.display(), directives);
    }
}

/// Non-blocking writer for the rolling log file, or `None` when the directory is unusable.
fn file_writer(log_dir: &Path) -> Option<tracing_appender::non_blocking::NonBlocking> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("File logging disabled, cannot create {}: {}", log_dir.display(), e);
        return None;
    }

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    FILE_GUARD.get_or_init(|| guard);
    Some(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_variable_wins_over_rust_log() {
        assert_eq!(filter_directives(Some("debug"), Some("warn")), "debug");
        assert_eq!(filter_directives(None, Some("warn")), "warn");
        assert_eq!(filter_directives(Some("  "), Some("trace")), "trace");
    }

    #[test]
    fn defaults_quiet_noisy_dependencies() {
        let directives = filter_directives(None, Some(""));
        assert_eq!(directives, DEFAULT_DIRECTIVES);
        assert!(directives.contains("sqlx=warn"));
        assert!(directives.contains("docqa_backend=info"));
    }

    #[test]
    fn bad_directives_fall_back_to_defaults() {
        let filter = build_filter("docqa_backend=loud");
        assert_eq!(filter.to_string(), EnvFilter::new(DEFAULT_DIRECTIVES).to_string());
    }

    #[test]
    fn log_directory_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let log_dir = tmp.path().join("nested").join("logs");

        assert!(file_writer(&log_dir).is_some());
        assert!(log_dir.is_dir());
    }
}
