use {
    crate::{
        active::ActiveFile,
        archive::Archiver,
        clock::Clock,
        error::{Result, RotatingLoggerError},
        format::Formatter,
        fs::FileSystem,
        policy::ArchivePattern,
        record::{LogRecord, Severity},
    },
    chrono::FixedOffset,
    crossbeam_channel::{select, Receiver, Sender},
    std::{
        io::{self, Write as _},
        path::PathBuf,
        sync::Arc,
    },
    tracing::{debug, error, info, warn},
};

/// Requests served by the consumer thread besides writing records.
///
/// The active handle is only ever touched on the consumer thread, so anything
/// that swaps it travels through here.
pub(crate) enum Control {
    /// Flush, rename the active file to a fresh archive name and open a new
    /// active file. Replies with the archive path.
    Rotate { reply: Sender<Result<PathBuf>> },
    /// Replace the handle with a newly opened file at the active path.
    Reopen { reply: Sender<Result<()>> },
    /// Write everything queued so far, then reply.
    Sync { reply: Sender<()> },
    /// Drain the queue, flush and exit.
    Shutdown,
}

/// Everything the consumer needs to name archives and reopen the active file.
pub(crate) struct ConsumerContext {
    pub directory: PathBuf,
    pub active_path: PathBuf,
    pub pattern: ArchivePattern,
    pub offset: FixedOffset,
    pub file_mode: Option<u32>,
    pub min_severity: Severity,
    pub console: bool,
    pub fs: Arc<dyn FileSystem>,
    pub clock: Arc<dyn Clock>,
}

/// The single writer: drains the record queue into the active file.
pub(crate) struct WriteConsumer {
    ctx: ConsumerContext,
    active: ActiveFile,
    formatter: Box<dyn Formatter>,
    records: Receiver<LogRecord>,
    control: Receiver<Control>,
}

impl WriteConsumer {
    pub fn new(
        ctx: ConsumerContext,
        active: ActiveFile,
        formatter: Box<dyn Formatter>,
        records: Receiver<LogRecord>,
        control: Receiver<Control>,
    ) -> Self {
        WriteConsumer {
            ctx,
            active,
            formatter,
            records,
            control,
        }
    }

    pub fn run(mut self) {
        loop {
            select! {
                recv(self.records) -> msg => match msg {
                    Ok(record) => self.write(record),
                    Err(_) => break,
                },
                recv(self.control) -> msg => match msg {
                    Ok(Control::Rotate { reply }) => {
                        let _ = reply.send(self.rotate());
                    }
                    Ok(Control::Reopen { reply }) => {
                        let _ = reply.send(self.reopen());
                    }
                    Ok(Control::Sync { reply }) => {
                        self.drain_pending();
                        let _ = reply.send(());
                    }
                    Ok(Control::Shutdown) | Err(_) => break,
                },
            }
        }

        let mut drained = 0;
        while let Ok(record) = self.records.try_recv() {
            self.write(record);
            drained += 1;
        }
        if let Err(err) = self.active.flush() {
            error!(path = %self.active.path().display(), error = %err, "final flush failed");
        }
        debug!(drained, "write consumer stopped");
    }

    fn write(&mut self, record: LogRecord) {
        if record.severity < self.ctx.min_severity {
            return;
        }
        let line = self.formatter.format(&record);
        if let Err(err) = self.active.write_line(line.as_bytes()) {
            error!(path = %self.active.path().display(), error = %err, "failed to write log record");
        }
        if self.ctx.console {
            if let Err(err) = io::stdout().lock().write_all(line.as_bytes()) {
                warn!(error = %err, "failed to echo log record to stdout");
            }
        }
    }

    /// Write the records queued right now. Returns how many were taken.
    fn drain_pending(&mut self) -> usize {
        let pending = self.records.len();
        let mut taken = 0;
        while taken < pending {
            match self.records.try_recv() {
                Ok(record) => {
                    self.write(record);
                    taken += 1;
                }
                Err(_) => break,
            }
        }
        taken
    }

    fn rotate(&mut self) -> Result<PathBuf> {
        self.active.flush()?;

        let archive_path = self.next_archive_path();
        let active_path = self.ctx.active_path.clone();
        self.ctx
            .fs
            .rename(&active_path, &archive_path)
            .map_err(|err| RotatingLoggerError::RenameFileError {
                from: active_path.clone(),
                to: archive_path.clone(),
                error: err.to_string(),
            })?;

        // Until a new file opens, keep writing into the renamed one so nothing
        // is lost; the monitor notices the missing active file and reopens.
        let fresh = ActiveFile::open(&*self.ctx.fs, &active_path, self.ctx.file_mode).inspect_err(|err| {
            warn!(path = %active_path.display(), error = %err, "failed to open new log file after rename");
        })?;
        self.active = fresh;

        info!(archive = %archive_path.display(), "rotated log file");
        Ok(archive_path)
    }

    fn reopen(&mut self) -> Result<()> {
        if let Err(err) = self.active.flush() {
            warn!(path = %self.active.path().display(), error = %err, "flush before reopen failed");
        }
        self.active = ActiveFile::open(&*self.ctx.fs, &self.ctx.active_path, self.ctx.file_mode)?;
        info!(path = %self.ctx.active_path.display(), "reopened log file");
        Ok(())
    }

    /// First free archive name for the current second, checking both the raw
    /// and the compressed form.
    fn next_archive_path(&self) -> PathBuf {
        let now = self.ctx.clock.now().with_timezone(&self.ctx.offset);
        let mut collision = 0;
        loop {
            let candidate = self.ctx.directory.join(self.ctx.pattern.file_name(&now, collision));
            if !self.ctx.fs.exists(&candidate) && !self.ctx.fs.exists(&Archiver::compressed_path(&candidate)) {
                return candidate;
            }
            collision += 1;
        }
    }
}
