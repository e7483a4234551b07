use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/posefit.log";

/// Log to stdout and to a file. Level comes from `TRACING_LEVEL`, the file
/// from `LOG_FILE_PATH`. Keep the returned guard alive until exit so the
/// file writer flushes.
///
/// Echoed tool output is logged under the `tool` target, so
/// `TRACING_LEVEL=info,tool=off` keeps it out of the log.
pub fn init_logger() -> WorkerGuard {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter_layer = EnvFilter::new(filter);

    let log_file_path =
        env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let (log_dir, log_file) = split_log_path(Path::new(&log_file_path));
    let dir_error = fs::create_dir_all(&log_dir).err();

    let file_appender = tracing_appender::rolling::never(&log_dir, &log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .without_time()
                .with_ansi(true),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .with(filter_layer)
        .init();

    if let Some(err) = dir_error {
        warn!("Could not create log folder {}: {}", log_dir.display(), err);
    }
    info!("Logging to stdout and {}", log_dir.join(&log_file).display());

    guard
}

/// Split a log file path into the folder to create and the file name.
/// A bare name logs into the working directory; a path without a file
/// name falls back to `posefit.log` inside it.
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "posefit.log".to_string());
    (dir, file)
}
