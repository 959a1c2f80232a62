use {
    crate::{
        error::{Result, RotatingLoggerError},
        fs::FileSystem,
    },
    flate2::{Compression, GzBuilder},
    std::{
        io::{self, Write as _},
        path::{Path, PathBuf},
        sync::Arc,
    },
    tracing::{debug, warn},
};

/// Extension appended to compressed archives.
pub const ARCHIVE_EXTENSION: &str = "gz";

/// Attempts made before a rotated file is left uncompressed.
const COMPRESS_ATTEMPTS: usize = 2;

/// Compresses rotated files into single-entry gzip archives.
///
/// The gzip header carries the rotated file's base name, so decompressing with
/// `gunzip -N` restores the original name.
pub struct Archiver {
    fs: Arc<dyn FileSystem>,
    file_mode: Option<u32>,
}

impl Archiver {
    pub fn new(fs: Arc<dyn FileSystem>, file_mode: Option<u32>) -> Self {
        Archiver { fs, file_mode }
    }

    /// Path of the archive produced for `path`.
    pub fn compressed_path(path: &Path) -> PathBuf {
        PathBuf::from(format!("{}.{}", path.to_string_lossy(), ARCHIVE_EXTENSION))
    }

    /// Compress `path` and remove it once the archive is completely written.
    ///
    /// A failed attempt removes its partial archive and is retried once. If
    /// both attempts fail the source is left in place untouched, where it still
    /// counts as a backup for retention.
    pub fn compress(&self, path: &Path) -> Result<PathBuf> {
        let compressed_path = Self::compressed_path(path);
        let mut last_err = None;
        for attempt in 1..=COMPRESS_ATTEMPTS {
            match self.write_archive(path, &compressed_path) {
                Ok(()) => {
                    last_err = None;
                    break;
                }
                Err(err) => {
                    warn!(path = %path.display(), attempt, error = %err, "failed to compress rotated log file");
                    if let Err(remove_err) = self.fs.remove_file(&compressed_path) {
                        if remove_err.kind() != io::ErrorKind::NotFound {
                            warn!(path = %compressed_path.display(), error = %remove_err, "failed to remove partial archive");
                        }
                    }
                    last_err = Some(err);
                }
            }
        }
        if let Some(err) = last_err {
            return Err(RotatingLoggerError::CompressFailed {
                path: path.to_path_buf(),
                error: err.to_string(),
            });
        }

        if let Some(mode) = self.file_mode {
            if let Err(err) = self.fs.set_mode(&compressed_path, mode) {
                warn!(path = %compressed_path.display(), error = %err, "failed to set archive permissions");
            }
        }

        // The archive is complete; a failed removal only leaves a duplicate.
        if let Err(err) = self.fs.remove_file(path) {
            warn!(path = %path.display(), error = %err, "failed to remove uncompressed rotated file");
        }
        debug!(from = %path.display(), to = %compressed_path.display(), "compressed rotated log file");
        Ok(compressed_path)
    }

    fn write_archive(&self, source: &Path, target: &Path) -> io::Result<()> {
        let entry_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let infile = self.fs.open_read(source)?;
        let mut reader = io::BufReader::new(infile);
        let outfile = self.fs.create(target)?;
        let writer = io::BufWriter::new(outfile);

        let mut encoder = GzBuilder::new()
            .filename(entry_name)
            .write(writer, Compression::default());
        io::copy(&mut reader, &mut encoder)?;
        let mut writer = encoder.finish()?;
        writer.flush()?;
        writer.get_ref().sync_all()
    }
}
