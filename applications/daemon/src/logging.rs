//! Tracing setup: stderr plus an append-only log file
//!
//! The filter comes from `RUST_LOG` and defaults to debug for the daemon
//! crates. The file layer never emits ANSI escapes.

use crate::error::{DaemonError, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "piosc=debug,piosc_daemon=debug,piosc_playback=debug";

/// Install the global subscriber
///
/// Creates the log file's parent directory on demand. Fails if a subscriber
/// is already installed.
pub fn init(log_file: &Path) -> Result<()> {
    let file = open_log_file(log_file)?;
    let writer = Arc::new(Mutex::new(file));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(move || FileLogWriter::new(Arc::clone(&writer))),
        )
        .try_init()
        .map_err(|e| DaemonError::Logging(e.to_string()))
}

/// Stderr-only logging for commands that do not need the log file
pub fn init_console() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| DaemonError::Logging(format!("open log file {}: {}", path.display(), e)))
}

struct FileLogWriter {
    file: Arc<Mutex<File>>,
}

impl FileLogWriter {
    fn new(file: Arc<Mutex<File>>) -> Self {
        Self { file }
    }
}

impl Write for FileLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_file_parent_created() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logs").join("nested").join("piosc.log");

        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn writer_appends() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("piosc.log");
        std::fs::write(&path, "existing\n").unwrap();

        let file = open_log_file(&path).unwrap();
        let mut writer = FileLogWriter::new(Arc::new(Mutex::new(file)));
        writer.write_all(b"next line\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing\nnext line\n");
    }
}
