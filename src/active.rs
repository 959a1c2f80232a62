use {
    crate::{
        error::{Result, RotatingLoggerError},
        fs::FileSystem,
    },
    std::{
        fs::File,
        io::{self, BufWriter, Write as _},
        path::{Path, PathBuf},
    },
};

/// The file currently being written, together with its buffered writer.
///
/// Only the consumer thread ever holds one, so there is exactly one open for
/// writing at any time.
pub struct ActiveFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ActiveFile {
    /// Open `path` for appending.
    ///
    /// If the file cannot be opened, the parent directory is created and the
    /// open retried once. The configured file mode, if any, is applied to the
    /// file afterwards.
    pub fn open(fs: &dyn FileSystem, path: &Path, file_mode: Option<u32>) -> Result<Self> {
        let mut open_res = fs.open_append(path);
        if open_res.is_err() {
            if let Some(parent) = path.parent() {
                fs.create_dir_all(parent)
                    .map_err(|err| RotatingLoggerError::CreateDirectoryFailed(parent.to_path_buf(), err.to_string()))?;
                open_res = fs.open_append(path);
            }
        }
        let file = open_res.map_err(|err| RotatingLoggerError::CreateFileFailed(path.to_path_buf(), err.to_string()))?;

        if let Some(mode) = file_mode {
            fs.set_mode(path, mode)
                .map_err(|err| RotatingLoggerError::SetFilePermissionsError {
                    path: path.to_path_buf(),
                    error: err.to_string(),
                })?;
        }

        Ok(ActiveFile {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one formatted record and flush it through to the file.
    pub fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.writer.write_all(line)?;
        self.writer.flush()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
