use {
    crate::{
        error::{Result, RotatingLoggerError},
        fs::FileSystem,
        policy::ArchivePattern,
    },
    std::{path::Path, path::PathBuf, sync::Arc},
    tracing::{info, warn},
};

/// Outcome of one retention sweep.
#[derive(Debug, Default)]
pub struct RetentionReport {
    /// Archives that were deleted, oldest first.
    pub removed: Vec<PathBuf>,
    /// Archives that should have been deleted but could not be.
    pub failed: Vec<(PathBuf, String)>,
    /// Archives matching the pattern before the sweep.
    pub scanned: usize,
}

/// Bounds the number of archives kept next to the active file.
pub struct RetentionManager {
    fs: Arc<dyn FileSystem>,
}

impl RetentionManager {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        RetentionManager { fs }
    }

    /// Delete all but the newest `max_backups` archives in `directory`.
    ///
    /// Both compressed and raw archives count. Age is the modification time;
    /// equal times fall back to the rotation order encoded in the name. A failed deletion is logged and
    /// the sweep carries on with the remaining candidates.
    pub fn enforce(&self, directory: &Path, pattern: &ArchivePattern, max_backups: usize) -> Result<RetentionReport> {
        let mut archives: Vec<_> = self
            .fs
            .list_dir(directory)
            .map_err(|err| RotatingLoggerError::InternalError(format!("failed to list '{}': {err}", directory.display())))?
            .into_iter()
            .filter(|entry| entry.is_file && pattern.matches(&entry.file_name))
            .collect();

        archives.sort_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| pattern.rotation_key(&a.file_name).cmp(&pattern.rotation_key(&b.file_name)))
                .then_with(|| a.file_name.cmp(&b.file_name))
        });

        let mut report = RetentionReport {
            scanned: archives.len(),
            ..RetentionReport::default()
        };
        let excess = archives.len().saturating_sub(max_backups);
        for entry in archives.into_iter().take(excess) {
            match self.fs.remove_file(&entry.path) {
                Ok(()) => {
                    info!(path = %entry.path.display(), "removed old log archive");
                    report.removed.push(entry.path);
                }
                Err(err) => {
                    warn!(path = %entry.path.display(), error = %err, "failed to remove old log archive");
                    report.failed.push((entry.path, err.to_string()));
                }
            }
        }
        Ok(report)
    }
}
