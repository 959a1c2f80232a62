use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
    time::SystemTime,
};

#[cfg(unix)]
use std::{fs::Permissions, os::unix::fs::PermissionsExt};

/// A directory entry as seen by the retention sweep.
#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub modified: SystemTime,
    pub is_file: bool,
}

/// File system operations used by the engine.
///
/// Every method has a default implementation backed by `std::fs`, so a test
/// double only overrides the operations it wants to break.
pub trait FileSystem: Send + Sync + 'static {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    /// Open for appending, creating the file if missing.
    fn open_append(&self, path: &Path) -> io::Result<File> {
        fs::OpenOptions::new().append(true).create(true).open(path)
    }

    fn open_read(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    /// Create or truncate.
    fn create(&self, path: &Path) -> io::Result<File> {
        File::create(path)
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        fs::metadata(path).map(|m| m.len())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    /// List the entries of a directory. Entries that vanish while listing are
    /// skipped.
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)?.flatten() {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            entries.push(DirEntryInfo {
                path: entry.path(),
                file_name: entry.file_name().to_string_lossy().into_owned(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                is_file: metadata.is_file(),
            });
        }
        Ok(entries)
    }

    /// Set octal permission bits. A no-op with a warning off unix.
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        #[cfg(unix)]
        {
            fs::set_permissions(path, Permissions::from_mode(mode))
        }
        #[cfg(not(unix))]
        {
            tracing::warn!(path = %path.display(), mode, "setting file permissions is not supported on this platform");
            Ok(())
        }
    }
}

/// The real file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {}
