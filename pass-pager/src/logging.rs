use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use anyhow::Context;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};

const MAX_LOG_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 3);

/// Keeps the non-blocking file writer alive; drop it last.
#[allow(dead_code)]
pub struct LoggerGuard(WorkerGuard);

pub fn init_logging(log_dir: impl AsRef<Path>, prefix: &str, level: &str) -> anyhow::Result<LoggerGuard> {
    let log_dir = log_dir.as_ref().to_path_buf();

    let (default_level, level_invalid) = match parse_level(level) {
        Some(filter) => (filter, false),
        None => (LevelFilter::INFO, true),
    };

    let builder = EnvFilter::builder().with_default_directive(default_level.into());
    let rust_log = std::env::var("RUST_LOG").unwrap_or_default();
    let console_filter = builder.clone().parse_lossy(&rust_log);
    let file_filter = builder.parse_lossy(&rust_log);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(&log_dir)
        .with_context(|| format!("Failed to create log file appender in {:?}", log_dir))?;
    let (non_blocking, guard) = NonBlocking::new(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(file_filter);
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if level_invalid {
        tracing::warn!("Invalid log level '{}', defaulting to 'info'", level);
    }

    // One-shot: the process usually lives for a single cycle.
    match cleanup_old_logs(&log_dir, prefix, MAX_LOG_AGE) {
        Ok(0) => {}
        Ok(removed) => tracing::info!(
            "Removed {} log files older than {} days from {:?}",
            removed,
            MAX_LOG_AGE.as_secs() / 86_400,
            log_dir
        ),
        Err(e) => tracing::warn!("Failed to scan {:?} for old logs: {}", log_dir, e),
    }

    Ok(LoggerGuard(guard))
}

fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" => Some(LevelFilter::WARN),
        "error" => Some(LevelFilter::ERROR),
        _ => None,
    }
}

/// Remove `<prefix>*.log` files in `log_dir` last modified more than
/// `max_age` ago. Files that cannot be inspected or removed are skipped.
fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let is_stale = |path: &Path| {
        fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .map(|modified| now.duration_since(modified).unwrap_or_default() > max_age)
            .unwrap_or(false)
    };

    let stale: Vec<PathBuf> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with(prefix) && name.ends_with(".log"))
        })
        .filter(|path| is_stale(path))
        .collect();

    let mut removed = 0;
    for path in stale {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Failed to delete old log file {:?}: {}", path, e),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::DEBUG));
        assert_eq!(parse_level("WARN"), Some(LevelFilter::WARN));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_cleanup_keeps_fresh_and_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("pass-pager.2026-01-01.log"), "x").unwrap();
        fs::write(temp_dir.path().join("other.log"), "x").unwrap();

        let deleted = cleanup_old_logs(temp_dir.path(), "pass-pager", MAX_LOG_AGE).unwrap();
        assert_eq!(deleted, 0);

        // Zero max age: the matching file is stale, the foreign one untouched.
        std::thread::sleep(Duration::from_millis(20));
        let deleted = cleanup_old_logs(temp_dir.path(), "pass-pager", Duration::ZERO).unwrap();
        assert_eq!(deleted, 1);
        assert!(temp_dir.path().join("other.log").exists());
    }

    #[test]
    fn test_cleanup_missing_dir_is_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(cleanup_old_logs(&temp_dir.path().join("absent"), "pass-pager", MAX_LOG_AGE).is_err());
    }
}
