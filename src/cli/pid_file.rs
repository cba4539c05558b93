//! PID file guarding against a second daemon

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::{debug, warn};

/// Default PID file location
const DEFAULT_PID_PATH: &str = "/tmp/tape-relay.pid";

/// PID file for daemon mode; removed again on drop once acquired
pub struct PidFile {
    path: PathBuf,
    owned: bool,
}

impl PidFile {
    /// Create a new PID file manager with default path
    pub fn new() -> Self {
        Self::with_path(DEFAULT_PID_PATH)
    }

    /// Create with custom path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owned: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// PID of a live process recorded in the file, if any.
    /// A file naming a dead process is removed.
    pub fn running_pid(&self) -> Option<u32> {
        let contents = fs::read_to_string(&self.path).ok()?;
        let pid: u32 = contents.trim().parse().ok()?;
        if pid == process::id() {
            return None;
        }

        // Signal 0 checks for existence without delivering anything
        match kill(Pid::from_raw(pid as i32), None::<Signal>) {
            Ok(()) | Err(Errno::EPERM) => Some(pid),
            Err(Errno::ESRCH) => {
                debug!(pid, path = %self.path.display(), "Removing stale PID file");
                let _ = fs::remove_file(&self.path);
                None
            }
            Err(_) => None,
        }
    }

    /// Write our PID, failing if another daemon is alive
    pub fn acquire(&mut self) -> Result<(), PidFileError> {
        if let Some(pid) = self.running_pid() {
            return Err(PidFileError::AlreadyRunning(pid));
        }

        let mut file = fs::File::create(&self.path)
            .map_err(|e| PidFileError::WriteFailed(e.to_string()))?;
        write!(file, "{}", process::id()).map_err(|e| PidFileError::WriteFailed(e.to_string()))?;
        self.owned = true;
        Ok(())
    }

    /// Remove the file if this process wrote it
    pub fn release(&mut self) -> Result<(), PidFileError> {
        if !self.owned {
            return Ok(());
        }
        self.owned = false;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PidFileError::RemoveFailed(e.to_string())),
        }
    }
}

impl Default for PidFile {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "Failed to clean up PID file");
        }
    }
}

/// PID file errors
#[derive(Debug, thiserror::Error)]
pub enum PidFileError {
    #[error("Another daemon is already running (PID: {0})")]
    AlreadyRunning(u32),

    #[error("Failed to write PID file: {0}")]
    WriteFailed(String),

    #[error("Failed to remove PID file: {0}")]
    RemoveFailed(String),
}
