//! Filesystem persistence sink

use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::application::ports::{DownloadHandle, PersistenceError, PersistenceSink};

/// Give up after this many name collisions
const MAX_SUFFIX: u32 = 1000;

/// Fallback when a suggested name has no usable file name component
const FALLBACK_NAME: &str = "recording";

/// Writes recordings into a directory, never overwriting existing files
#[derive(Debug, Clone)]
pub struct FilesystemSink {
    dir: PathBuf,
}

impl FilesystemSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The user's download directory, falling back to home then cwd
    pub fn default_dir() -> PathBuf {
        dirs::download_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write_new(path: &Path, bytes: &[u8]) -> io::Result<()> {
        Self::create_with(path, |mut file| async move {
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await
        })
        .await
    }

    /// Create `path` exclusively and fill it with `write`.
    /// A failed write removes the file so no partial recording is left behind.
    async fn create_with<F, Fut>(path: &Path, write: F) -> io::Result<()>
    where
        F: FnOnce(File) -> Fut,
        Fut: Future<Output = io::Result<()>>,
    {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;

        if let Err(e) = write(file).await {
            if let Err(cleanup) = fs::remove_file(path).await {
                warn!(path = %path.display(), error = %cleanup, "Could not remove partial recording");
            }
            return Err(e);
        }
        Ok(())
    }
}

impl Default for FilesystemSink {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

#[async_trait]
impl PersistenceSink for FilesystemSink {
    async fn save(
        &self,
        bytes: Vec<u8>,
        suggested_filename: &str,
    ) -> Result<DownloadHandle, PersistenceError> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            PersistenceError::Unavailable(format!("{}: {}", self.dir.display(), e))
        })?;

        let name = file_name_only(suggested_filename);
        for attempt in 0..MAX_SUFFIX {
            let path = self.dir.join(candidate_name(&name, attempt));
            match Self::write_new(&path, &bytes).await {
                Ok(()) => {
                    debug!(path = %path.display(), size = bytes.len(), "Wrote recording");
                    return Ok(DownloadHandle {
                        location: path.display().to_string(),
                        size: bytes.len(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(PersistenceError::WriteFailed {
                        filename: name,
                        message: e.to_string(),
                    })
                }
            }
        }

        Err(PersistenceError::WriteFailed {
            filename: name,
            message: format!("{} files with this name already exist", MAX_SUFFIX),
        })
    }
}

/// Strip any directory components from a suggested name
fn file_name_only(suggested: &str) -> String {
    Path::new(suggested)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_NAME)
        .to_string()
}

/// `name.ext`, then `name (1).ext`, `name (2).ext`, ...
fn candidate_name(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{} ({}).{}", stem, attempt, ext),
        None => format!("{} ({})", stem, attempt),
    }
}
