use {
    crate::{
        archive::Archiver,
        consumer::Control,
        error::{Result, RotatingLoggerError},
        fs::FileSystem,
        policy::RotationPolicy,
        retention::RetentionManager,
    },
    crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender},
    std::{io, path::PathBuf, sync::Arc},
    tracing::{debug, error, info, warn},
};

/// What a single poll of the active file led to.
#[derive(Debug, PartialEq)]
pub(crate) enum TickOutcome {
    /// Below or at the threshold.
    Idle,
    /// Rotated; the path is the surviving archive (compressed when that
    /// succeeded).
    Rotated(PathBuf),
    /// The active file was missing and has been recreated.
    Reopened,
    /// Something failed; retried on the next tick.
    Failed,
}

/// Polls the active file size and drives rotation, archival and retention.
pub(crate) struct RotationMonitor {
    directory: PathBuf,
    active_path: PathBuf,
    policy: RotationPolicy,
    fs: Arc<dyn FileSystem>,
    archiver: Archiver,
    retention: RetentionManager,
    control: Sender<Control>,
}

impl RotationMonitor {
    pub fn new(
        directory: PathBuf,
        active_path: PathBuf,
        policy: RotationPolicy,
        fs: Arc<dyn FileSystem>,
        file_mode: Option<u32>,
        control: Sender<Control>,
    ) -> Self {
        RotationMonitor {
            directory,
            active_path,
            policy,
            archiver: Archiver::new(fs.clone(), file_mode),
            retention: RetentionManager::new(fs.clone()),
            fs,
            control,
        }
    }

    /// Tick every `check_interval` until `shutdown` is signalled or dropped.
    pub fn run(self, shutdown: Receiver<()>) {
        loop {
            match shutdown.recv_timeout(self.policy.check_interval) {
                Err(RecvTimeoutError::Timeout) => {
                    self.tick();
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("rotation monitor stopped");
    }

    pub fn tick(&self) -> TickOutcome {
        let size = match self.fs.file_size(&self.active_path) {
            Ok(size) => size,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(path = %self.active_path.display(), "log file is missing, reopening");
                return match self.request(|reply| Control::Reopen { reply }) {
                    Ok(()) => TickOutcome::Reopened,
                    Err(err) => {
                        error!(path = %self.active_path.display(), error = %err, "failed to reopen log file");
                        TickOutcome::Failed
                    }
                };
            }
            Err(err) => {
                error!(path = %self.active_path.display(), error = %err, "failed to get log file info");
                return TickOutcome::Failed;
            }
        };

        if !self.policy.should_rotate(size) {
            return TickOutcome::Idle;
        }

        info!(size, limit = self.policy.max_size.bytes(), "log file size exceeded the limit");
        let archive = match self.request(|reply| Control::Rotate { reply }) {
            Ok(archive) => archive,
            Err(err) => {
                error!(path = %self.active_path.display(), error = %err, "log rotation failed");
                return TickOutcome::Failed;
            }
        };

        TickOutcome::Rotated(self.hand_off(archive))
    }

    /// Compress (when enabled) and then sweep old archives. Neither step
    /// undoes the rotation that already happened.
    fn hand_off(&self, archive: PathBuf) -> PathBuf {
        let mut kept = archive;
        if self.policy.compress {
            match self.archiver.compress(&kept) {
                Ok(compressed) => kept = compressed,
                Err(err) => {
                    warn!(path = %kept.display(), error = %err, "keeping rotated file uncompressed");
                }
            }
        }

        match self
            .retention
            .enforce(&self.directory, &self.policy.archive_pattern, self.policy.max_backups)
        {
            Ok(report) => debug!(
                scanned = report.scanned,
                removed = report.removed.len(),
                failed = report.failed.len(),
                "retention sweep finished"
            ),
            Err(err) => error!(directory = %self.directory.display(), error = %err, "retention sweep failed"),
        }
        kept
    }

    /// Send a control request to the consumer and wait for its answer.
    fn request<T>(&self, make: impl FnOnce(Sender<Result<T>>) -> Control) -> Result<T> {
        let (reply_tx, reply_rx) = bounded(1);
        self.control
            .send(make(reply_tx))
            .map_err(|_| RotatingLoggerError::Closed)?;
        reply_rx.recv().map_err(|_| RotatingLoggerError::Closed)?
    }
}
