//! Logging setup
//!
//! Every run appends to `{logs}/mlink.log`. Console logging on stderr is off
//! unless `--debug` is given or `RUST_LOG` is set, so it never interleaves
//! with command output.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Log file name prefix; the file is `mlink.log`
const LOG_FILE_PREFIX: &str = "mlink";

/// Crates whose events are worth logging
const CRATES: &[&str] = &["mlink", "mlink_cli", "mlink_core", "mlink_s3", "mlink_yourls"];

/// Default log directory: `{data_local_dir}/mlink/logs`, or `./logs`
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("mlink").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Filter directives: `level` for mlink's own crates, warnings for the rest
pub fn directives(level: &str) -> String {
    let mut directives = String::from("warn");
    for krate in CRATES {
        directives.push_str(&format!(",{krate}={level}"));
    }
    directives
}

fn console_filter(debug: bool) -> Option<EnvFilter> {
    if debug {
        return Some(EnvFilter::new(directives("debug")));
    }
    EnvFilter::try_from_default_env().ok()
}

fn file_writer(dir: &Path) -> anyhow::Result<tracing_appender::rolling::RollingFileAppender> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    Builder::new()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(dir)
        .with_context(|| format!("failed to open log file in {}", dir.display()))
}

/// Install the global subscriber
///
/// The returned guard flushes the file writer when dropped and must outlive
/// every log call. A log directory that cannot be opened disables file
/// logging and is reported as the error half of the tuple.
pub fn init(debug: bool, logs: Option<&Path>) -> (Option<WorkerGuard>, Option<anyhow::Error>) {
    let dir = logs.map(Path::to_path_buf).unwrap_or_else(default_log_dir);

    let (file_layer, guard, failure) = match file_writer(&dir) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let level = if debug { "debug" } else { "info" };
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new(directives(level)));
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    let console_layer = console_filter(debug).map(|filter| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(filter)
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    (guard, failure)
}
