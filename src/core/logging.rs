//! Logging Setup
//!
//! Console output for humans plus an optional JSON file log rotated daily.
//! Library code logs through the `log` facade; records are bridged into
//! `tracing` so spans from the import pipeline and plain log lines share
//! the same subscriber.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Base name of the rolling log file
pub const LOG_FILE_NAME: &str = "tibetan-corpus.log";

/// Filter from `RUST_LOG`, else `default_level`.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the logging system.
///
/// Console logs go to stderr so command output on stdout stays clean. When
/// `log_dir` is set, JSON logs are also written there and older daily files
/// are compressed in the background.
///
/// Returns a `WorkerGuard` when a file log is active; keep it alive for the
/// duration of the program so buffered lines are flushed on exit.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .compact()
        .with_target(false)
        .with_filter(env_filter(&config.level));

    let log_dir = config.log_dir.as_deref().and_then(prepare_log_dir);
    let (file_layer, guard) = match &log_dir {
        Some(log_dir) => {
            let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .json()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_filter(env_filter(&config.level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("Logging already initialized: {}", e);
        return guard;
    }

    // no-op when `try_init` already bridged `log`
    let _ = tracing_log::LogTracer::init();

    if let Some(log_dir) = log_dir {
        log::debug!("Writing JSON logs to {}", log_dir.join(LOG_FILE_NAME).display());
        std::thread::spawn(move || compress_old_logs(&log_dir));
    }

    guard
}

fn prepare_log_dir(dir: &Path) -> Option<PathBuf> {
    match fs::create_dir_all(dir) {
        Ok(()) => Some(dir.to_path_buf()),
        Err(e) => {
            eprintln!("Failed to create log directory {}: {}", dir.display(), e);
            None
        }
    }
}

/// Whether a file in the log directory is a finished daily log.
fn is_stale_log(name: &str, today_suffix: &str) -> bool {
    name.starts_with(&format!("{LOG_FILE_NAME}."))
        && !name.ends_with(today_suffix)
        && !name.ends_with(".gz")
}

/// Gzip every finished daily log in `log_dir`.
fn compress_old_logs(log_dir: &Path) {
    let today_suffix = chrono::Local::now().format("%Y-%m-%d").to_string();

    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };
    for path in entries.flatten().map(|e| e.path()) {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_stale_log(name, &today_suffix) {
            continue;
        }
        match compress_file(&path) {
            Ok(()) => log::info!("Compressed old log: {}", path.display()),
            Err(e) => log::warn!("Failed to compress old log {}: {}", path.display(), e),
        }
    }
}

fn compress_file(path: &Path) -> io::Result<()> {
    let mut gz_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "No filename"))?
        .to_os_string();
    gz_name.push(".gz");
    let gz_path = path.with_file_name(gz_name);

    if gz_path.exists() {
        return Ok(());
    }

    let mut reader = io::BufReader::new(fs::File::open(path)?);
    let mut encoder = GzEncoder::new(fs::File::create(&gz_path)?, Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)
}
