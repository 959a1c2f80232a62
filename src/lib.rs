//! # rotalog
//!
//! rotalog is a size-based log rotation engine. Producers on any number of
//! threads hand structured records to a bounded queue; a single writer thread
//! formats them into one active log file, and a monitor thread polls that
//! file's size. Once the file grows past the configured limit it is renamed to
//! a timestamped archive, optionally gzip-compressed, and the oldest archives
//! beyond the configured backup count are deleted.
//!
//! A full queue blocks the producer instead of dropping records. Records below
//! the minimum severity are discarded by the writer without a trace.
//!
//! ## Example
//!
//! ```no_run
//! use {
//!     rotalog::{RotatingLoggerBuilder, RotationSize, Severity},
//!     std::time::Duration,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut logger = RotatingLoggerBuilder::new("./logs", "application.log")
//!         .archive_pattern("application-{timestamp}.log")
//!         .max_size(RotationSize::MB(1))
//!         .max_backups(3)
//!         .check_interval(Duration::from_secs(1))
//!         .compress(true)
//!         .min_severity(Severity::Info)
//!         .build()?;
//!
//!     logger.info("service started")?;
//!     logger.debug("not written, below the floor")?;
//!
//!     // Drains the queue and flushes; also runs on drop.
//!     logger.shutdown();
//!     Ok(())
//! }
//! ```
mod active;
mod archive;
mod clock;
mod consumer;
mod error;
mod format;
mod fs;
mod monitor;
mod policy;
mod record;
mod retention;

pub use {
    archive::{Archiver, ARCHIVE_EXTENSION},
    clock::{Clock, ManualClock, SystemClock},
    error::{Result, RotatingLoggerError},
    format::{Formatter, JournalFormatter, APP_NAME_FIELD},
    fs::{DirEntryInfo, FileSystem, StdFileSystem},
    policy::{ArchivePattern, RotationPolicy, RotationSize, TimeZone, TIMESTAMP_FORMAT, TIMESTAMP_PLACEHOLDER},
    record::{Fields, LogRecord, Severity, Value},
    retention::{RetentionManager, RetentionReport},
};

use {
    active::ActiveFile,
    consumer::{ConsumerContext, Control, WriteConsumer},
    crossbeam_channel::{bounded, unbounded, Sender},
    monitor::RotationMonitor,
    std::{
        path::{Path, PathBuf},
        sync::Arc,
        thread::{self, JoinHandle},
        time::Duration,
    },
    tracing::{error, info},
};

/// Cheap, cloneable producer handle.
///
/// Every clone feeds the same bounded queue. Once the owning
/// [`RotatingLogger`] has shut down, logging returns
/// [`RotatingLoggerError::Closed`].
#[derive(Clone)]
pub struct LogHandle {
    records: Sender<LogRecord>,
    control: Sender<Control>,
    clock: Arc<dyn Clock>,
}

impl LogHandle {
    /// Enqueue a record, blocking while the queue is full.
    pub fn log(&self, severity: Severity, message: impl Into<String>, fields: Fields) -> Result<()> {
        let record = LogRecord::new(severity, message, fields, self.clock.now());
        self.records.send(record).map_err(|_| RotatingLoggerError::Closed)
    }

    pub fn trace(&self, message: impl Into<String>) -> Result<()> {
        self.log(Severity::Trace, message, Fields::new())
    }

    pub fn debug(&self, message: impl Into<String>) -> Result<()> {
        self.log(Severity::Debug, message, Fields::new())
    }

    pub fn info(&self, message: impl Into<String>) -> Result<()> {
        self.log(Severity::Info, message, Fields::new())
    }

    pub fn warn(&self, message: impl Into<String>) -> Result<()> {
        self.log(Severity::Warn, message, Fields::new())
    }

    pub fn error(&self, message: impl Into<String>) -> Result<()> {
        self.log(Severity::Error, message, Fields::new())
    }

    pub fn fatal(&self, message: impl Into<String>) -> Result<()> {
        self.log(Severity::Fatal, message, Fields::new())
    }

    /// Block until every record this handle enqueued before the call has been
    /// written to the active file.
    pub fn sync(&self) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.control
            .send(Control::Sync { reply: reply_tx })
            .map_err(|_| RotatingLoggerError::Closed)?;
        reply_rx.recv().map_err(|_| RotatingLoggerError::Closed)
    }
}

/// The rotation engine: owns the writer and monitor threads.
///
/// Dropping the logger shuts it down the same way [`RotatingLogger::shutdown`]
/// does.
pub struct RotatingLogger {
    handle: LogHandle,
    active_path: PathBuf,
    shutdown: Option<Sender<()>>,
    monitor: Option<JoinHandle<()>>,
    consumer: Option<JoinHandle<()>>,
}

impl RotatingLogger {
    /// A producer handle that can be moved to other threads.
    pub fn handle(&self) -> LogHandle {
        self.handle.clone()
    }

    /// Path of the file currently being written.
    pub fn active_path(&self) -> &Path {
        &self.active_path
    }

    pub fn log(&self, severity: Severity, message: impl Into<String>, fields: Fields) -> Result<()> {
        self.handle.log(severity, message, fields)
    }

    pub fn trace(&self, message: impl Into<String>) -> Result<()> {
        self.handle.trace(message)
    }

    pub fn debug(&self, message: impl Into<String>) -> Result<()> {
        self.handle.debug(message)
    }

    pub fn info(&self, message: impl Into<String>) -> Result<()> {
        self.handle.info(message)
    }

    pub fn warn(&self, message: impl Into<String>) -> Result<()> {
        self.handle.warn(message)
    }

    pub fn error(&self, message: impl Into<String>) -> Result<()> {
        self.handle.error(message)
    }

    pub fn fatal(&self, message: impl Into<String>) -> Result<()> {
        self.handle.fatal(message)
    }

    pub fn sync(&self) -> Result<()> {
        self.handle.sync()
    }

    /// Stop the monitor, then drain the queue, flush and stop the writer.
    ///
    /// Calling it again is a no-op.
    pub fn shutdown(&mut self) {
        // Dropping the sender wakes the monitor out of its interval wait.
        drop(self.shutdown.take());
        if let Some(monitor) = self.monitor.take() {
            if monitor.join().is_err() {
                error!("rotation monitor thread panicked");
            }
        }
        if let Some(consumer) = self.consumer.take() {
            let _ = self.handle.control.send(Control::Shutdown);
            if consumer.join().is_err() {
                error!("write consumer thread panicked");
            }
            info!(path = %self.active_path.display(), "rotating logger stopped");
        }
    }
}

impl Drop for RotatingLogger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Settings collected by the builder.
struct LoggerMeta {
    /// The directory holding the active file and its archives.
    directory: PathBuf,
    /// The active file's name.
    filename: PathBuf,
    /// Archive name template; derived from the filename when unset.
    archive_pattern: Option<String>,
    compress: bool,
    max_size: RotationSize,
    max_backups: usize,
    check_interval: Duration,
    /// Capacity of the ingestion queue.
    buffer_size: usize,
    min_severity: Severity,
    app_name: String,
    time_zone: TimeZone,
    /// The file permissions to set on newly created log files and archives
    /// (Unix-like systems only), in octal notation such as 0o644.
    file_mode: Option<u32>,
    /// Also echo every written line to stdout.
    console: bool,
    clock: Arc<dyn Clock>,
    fs: Arc<dyn FileSystem>,
    formatter: Option<Box<dyn Formatter>>,
}

impl LoggerMeta {
    fn new<P: AsRef<Path>>(directory: P, filename: P) -> Self {
        LoggerMeta {
            directory: directory.as_ref().to_path_buf(),
            filename: filename.as_ref().to_path_buf(),
            archive_pattern: None,
            compress: true,
            max_size: RotationSize::MB(1),
            max_backups: 3,
            check_interval: Duration::from_secs(1),
            buffer_size: 100,
            min_severity: Severity::Info,
            app_name: "app".to_string(),
            time_zone: TimeZone::Local,
            file_mode: None,
            console: false,
            clock: Arc::new(SystemClock),
            fs: Arc::new(StdFileSystem),
            formatter: None,
        }
    }

    /// `application.log` becomes `application-{timestamp}.log`.
    fn default_archive_pattern(&self) -> String {
        let stem = self
            .filename
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self.filename.extension() {
            Some(ext) => format!("{stem}-{TIMESTAMP_PLACEHOLDER}.{}", ext.to_string_lossy()),
            None => format!("{stem}-{TIMESTAMP_PLACEHOLDER}"),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(RotatingLoggerError::InvalidConfig("buffer size must be at least 1".into()));
        }
        if self.check_interval.is_zero() {
            return Err(RotatingLoggerError::InvalidConfig("check interval must be non-zero".into()));
        }
        if self.filename.as_os_str().is_empty() || self.filename.components().count() != 1 {
            return Err(RotatingLoggerError::InvalidConfig(format!(
                "log filename '{}' must be a plain file name",
                self.filename.display()
            )));
        }
        Ok(())
    }
}

/// Provides a fluent interface for configuring a [`RotatingLogger`].
///
/// # Default Configuration
///
/// * Rotate when the active file exceeds 1 MB, checked every second
/// * Keep 3 backups, gzip-compressed
/// * Archive names derived from the file name: `app.log` rotates to
///   `app-<YYYY-MM-DD-HH-MM-SS>.log.gz`
/// * Queue capacity of 100 records, minimum severity `Info`
/// * Local time zone, no console echo, default file permissions
///
/// # Examples
///
/// ```no_run
/// use rotalog::{RotatingLoggerBuilder, RotationSize, TimeZone};
///
/// let logger = RotatingLoggerBuilder::new("./logs", "billing.log")
///     .max_size(RotationSize::KB(256))
///     .max_backups(10)
///     .time_zone(TimeZone::UTC)
///     .app_name("billing")
///     .file_mode(0o640)
///     .build()
///     .unwrap();
/// ```
pub struct RotatingLoggerBuilder {
    meta: LoggerMeta,
}

impl RotatingLoggerBuilder {
    /// Create a new builder.
    /// # Arguments
    /// * `directory` - The directory where the log files are stored.
    /// * `filename` - The name of the active log file.
    pub fn new<P: AsRef<Path>>(directory: P, filename: P) -> Self {
        RotatingLoggerBuilder {
            meta: LoggerMeta::new(directory, filename),
        }
    }

    /// Set the archive name template. It must contain `{timestamp}` once.
    pub fn archive_pattern(self, pattern: impl Into<String>) -> Self {
        Self {
            meta: LoggerMeta {
                archive_pattern: Some(pattern.into()),
                ..self.meta
            },
        }
    }

    /// Gzip rotated files.
    pub fn compress(self, compress: bool) -> Self {
        Self {
            meta: LoggerMeta { compress, ..self.meta },
        }
    }

    /// Size the active file must exceed before it is rotated.
    pub fn max_size(self, max_size: RotationSize) -> Self {
        Self {
            meta: LoggerMeta { max_size, ..self.meta },
        }
    }

    /// Number of archives kept after each rotation.
    pub fn max_backups(self, max_backups: usize) -> Self {
        Self {
            meta: LoggerMeta { max_backups, ..self.meta },
        }
    }

    pub fn check_interval(self, check_interval: Duration) -> Self {
        Self {
            meta: LoggerMeta {
                check_interval,
                ..self.meta
            },
        }
    }

    /// Capacity of the ingestion queue. Producers block while it is full.
    pub fn buffer_size(self, buffer_size: usize) -> Self {
        Self {
            meta: LoggerMeta { buffer_size, ..self.meta },
        }
    }

    pub fn min_severity(self, min_severity: Severity) -> Self {
        Self {
            meta: LoggerMeta { min_severity, ..self.meta },
        }
    }

    /// Application name used by the default formatter.
    pub fn app_name(self, app_name: impl Into<String>) -> Self {
        Self {
            meta: LoggerMeta {
                app_name: app_name.into(),
                ..self.meta
            },
        }
    }

    /// Set the time zone for archive names and formatted lines.
    pub fn time_zone(self, time_zone: TimeZone) -> Self {
        Self {
            meta: LoggerMeta { time_zone, ..self.meta },
        }
    }

    /// Set the file permissions for log files (Unix-like systems only).
    /// This sets the file mode bits in octal notation like when using chmod.
    pub fn file_mode(self, mode: u32) -> Self {
        Self {
            meta: LoggerMeta {
                file_mode: Some(mode),
                ..self.meta
            },
        }
    }

    /// Echo every written line to stdout as well.
    pub fn console_output(self, console: bool) -> Self {
        Self {
            meta: LoggerMeta { console, ..self.meta },
        }
    }

    pub fn clock(self, clock: Arc<dyn Clock>) -> Self {
        Self {
            meta: LoggerMeta { clock, ..self.meta },
        }
    }

    pub fn file_system(self, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            meta: LoggerMeta { fs, ..self.meta },
        }
    }

    /// Replace the default journal-style formatter.
    pub fn formatter(self, formatter: impl Formatter) -> Self {
        Self {
            meta: LoggerMeta {
                formatter: Some(Box::new(formatter)),
                ..self.meta
            },
        }
    }

    /// Create the log directory, open the active file and start the writer
    /// and monitor threads.
    pub fn build(self) -> Result<RotatingLogger> {
        let meta = self.meta;
        meta.validate()?;

        let pattern_template = meta
            .archive_pattern
            .clone()
            .unwrap_or_else(|| meta.default_archive_pattern());
        let policy = RotationPolicy {
            max_size: meta.max_size,
            check_interval: meta.check_interval,
            max_backups: meta.max_backups,
            compress: meta.compress,
            archive_pattern: ArchivePattern::new(&pattern_template)?,
        };
        let offset = meta.time_zone.offset();

        meta.fs
            .create_dir_all(&meta.directory)
            .map_err(|err| RotatingLoggerError::CreateDirectoryFailed(meta.directory.clone(), err.to_string()))?;
        let active_path = meta.directory.join(&meta.filename);
        let active = ActiveFile::open(&*meta.fs, &active_path, meta.file_mode)?;

        let (records_tx, records_rx) = bounded(meta.buffer_size);
        let (control_tx, control_rx) = unbounded();
        let (shutdown_tx, shutdown_rx) = bounded(1);

        let formatter = meta
            .formatter
            .unwrap_or_else(|| Box::new(JournalFormatter::new(meta.app_name.clone(), offset)) as Box<dyn Formatter>);
        let consumer = WriteConsumer::new(
            ConsumerContext {
                directory: meta.directory.clone(),
                active_path: active_path.clone(),
                pattern: policy.archive_pattern.clone(),
                offset,
                file_mode: meta.file_mode,
                min_severity: meta.min_severity,
                console: meta.console,
                fs: meta.fs.clone(),
                clock: meta.clock.clone(),
            },
            active,
            formatter,
            records_rx,
            control_rx,
        );
        let consumer = thread::Builder::new()
            .name("rotalog-writer".into())
            .spawn(move || consumer.run())
            .map_err(|err| RotatingLoggerError::SpawnFailed("rotalog-writer", err.to_string()))?;

        let monitor = RotationMonitor::new(
            meta.directory.clone(),
            active_path.clone(),
            policy,
            meta.fs.clone(),
            meta.file_mode,
            control_tx.clone(),
        );
        let monitor = thread::Builder::new()
            .name("rotalog-monitor".into())
            .spawn(move || monitor.run(shutdown_rx))
            .map_err(|err| RotatingLoggerError::SpawnFailed("rotalog-monitor", err.to_string()))?;

        info!(
            path = %active_path.display(),
            archive_pattern = %pattern_template,
            max_size = meta.max_size.bytes(),
            max_backups = meta.max_backups,
            "rotating logger started"
        );

        Ok(RotatingLogger {
            handle: LogHandle {
                records: records_tx,
                control: control_tx,
                clock: meta.clock,
            },
            active_path,
            shutdown: Some(shutdown_tx),
            monitor: Some(monitor),
            consumer: Some(consumer),
        })
    }
}
