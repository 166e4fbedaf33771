use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_LOG_FILE: &str = "llm-compare.logs.jsonl";

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Logging settings resolved from the environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct LogSettings {
    enabled: bool,
    level: Option<String>,
    json_path: Option<PathBuf>,
}

impl LogSettings {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup("COMPARE_OBSERVABILITY_ENABLED")
            .map(|v| parse_bool_env(&v).unwrap_or(true))
            .unwrap_or(true);
        let level = lookup("COMPARE_LOG_LEVEL").filter(|v| !v.trim().is_empty());
        let json_path = lookup("COMPARE_JSON_LOG_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        Self {
            enabled,
            level,
            json_path,
        }
    }

    fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        if let Some(level) = &self.level
            && let Ok(filter) = tracing_subscriber::EnvFilter::try_new(level)
        {
            return filter;
        }
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    }
}

/// Directory and file name for a JSONL log path. A bare file name logs
/// into the working directory.
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (dir, file_name)
}

fn json_file_writer(path: &Path) -> tracing_appender::rolling::RollingFileAppender {
    let (dir, file_name) = split_log_path(path);
    let _ = std::fs::create_dir_all(&dir);
    tracing_appender::rolling::never(dir, file_name)
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `COMPARE_OBSERVABILITY_ENABLED`: optional enable/disable flag (default enabled).
/// - `COMPARE_LOG_LEVEL`: optional level/filter override (`info`, `compare_core=debug`, ...).
/// - `COMPARE_JSON_LOG_PATH`: optional log file path. If set, logs are JSONL in that file.
///   If unset, logs go to stderr in a compact console format so stdout stays
///   free for comparison output.
/// - `RUST_LOG`: fallback filter when `COMPARE_LOG_LEVEL` is unset or invalid.
pub fn init_observability() {
    INIT.get_or_init(|| {
        let settings = LogSettings::from_lookup(|key| std::env::var(key).ok());
        if !settings.enabled {
            return;
        }

        let env_filter = settings.env_filter();
        let registry = tracing_subscriber::registry().with(env_filter);
        let _ = match &settings.json_path {
            Some(path) => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(false)
                        .with_writer(json_file_writer(path)),
                )
                .try_init(),
            None => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        };
    });
}
