//! Rolling Logger
//!
//! Installs a global `tracing` subscriber that writes to a size-rotated file
//! and mirrors every line into an in-memory ring buffer. Records emitted
//! through the `log` facade are captured as well.

mod buffer;
mod writer;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;

pub use buffer::{LineBuffer, LogLine};
pub use writer::RollingFileWriter;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("log file error: {0}")]
    Io(#[from] io::Error),
    #[error("logger already initialized")]
    AlreadyInitialized,
    #[error("logger not initialized")]
    NotInitialized,
    #[error("failed to install subscriber: {0}")]
    Install(String),
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub level: log::LevelFilter,
    /// Rotate once the file would grow past this size. 0 disables rotation.
    pub max_file_bytes: u64,
    /// Rotated files kept next to the active one
    pub max_files: usize,
    /// Lines kept in memory for `recent_lines`
    pub buffer_lines: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: log::LevelFilter::Info,
            max_file_bytes: 5 * 1024 * 1024,
            max_files: 3,
            buffer_lines: 1000,
        }
    }
}

/// Handle to the installed logger
#[derive(Clone)]
pub struct LoggerHandle {
    path: PathBuf,
    buffer: LineBuffer,
}

impl LoggerHandle {
    /// Active log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The newest `n` lines, oldest first
    pub fn recent_lines(&self, n: usize) -> Vec<LogLine> {
        self.buffer.recent(n)
    }
}

static LOGGER: OnceLock<LoggerHandle> = OnceLock::new();

/// `MakeWriter` feeding both the rotating file and the line buffer
#[derive(Clone)]
pub struct LogSink {
    file: Arc<Mutex<RollingFileWriter>>,
    buffer: LineBuffer,
}

impl LogSink {
    pub fn new(file: RollingFileWriter, buffer: LineBuffer) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
            buffer,
        }
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_all(buf)?;
        for line in String::from_utf8_lossy(buf).lines() {
            if !line.is_empty() {
                self.buffer.push(line);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner).flush()
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn tracing_level(level: log::LevelFilter) -> tracing_subscriber::filter::LevelFilter {
    use tracing_subscriber::filter::LevelFilter;
    match level {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    }
}

/// Subscriber writing plain-text lines into `sink`
pub fn build_subscriber(sink: LogSink, level: log::LevelFilter) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_writer(sink)
        .with_ansi(false)
        .with_target(true)
        .with_max_level(tracing_level(level))
        .finish()
}

/// Initialize the global logger with default settings.
/// Logs go to `<log_dir>/<app_name>.log`.
pub fn init_logger(log_dir: impl AsRef<Path>, app_name: &str) -> Result<LoggerHandle, LoggerError> {
    init_logger_with(log_dir, app_name, LoggerConfig::default())
}

pub fn init_logger_with(
    log_dir: impl AsRef<Path>,
    app_name: &str,
    config: LoggerConfig,
) -> Result<LoggerHandle, LoggerError> {
    if LOGGER.get().is_some() {
        return Err(LoggerError::AlreadyInitialized);
    }

    let path = log_dir.as_ref().join(format!("{}.log", app_name));
    let file = RollingFileWriter::open(path.clone(), config.max_file_bytes, config.max_files)?;
    let buffer = LineBuffer::new(config.buffer_lines);
    let sink = LogSink::new(file, buffer.clone());

    build_subscriber(sink, config.level)
        .try_init()
        .map_err(|e| LoggerError::Install(e.to_string()))?;

    let handle = LoggerHandle { path, buffer };
    LOGGER
        .set(handle.clone())
        .map_err(|_| LoggerError::AlreadyInitialized)?;
    tracing::info!(target: "rolling_logger", "Logger initialized at {}", handle.path.display());
    Ok(handle)
}

/// Handle of the installed logger, if any
pub fn handle() -> Option<&'static LoggerHandle> {
    LOGGER.get()
}

fn ensure_init() -> Result<(), LoggerError> {
    LOGGER.get().map(|_| ()).ok_or(LoggerError::NotInitialized)
}

pub fn info(msg: &str) -> Result<(), LoggerError> {
    ensure_init()?;
    tracing::info!("{}", msg);
    Ok(())
}

pub fn warn(msg: &str) -> Result<(), LoggerError> {
    ensure_init()?;
    tracing::warn!("{}", msg);
    Ok(())
}

pub fn error(msg: &str) -> Result<(), LoggerError> {
    ensure_init()?;
    tracing::error!("{}", msg);
    Ok(())
}
