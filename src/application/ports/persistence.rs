//! Persistence sink port interface

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a saved recording ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadHandle {
    pub location: String,
    pub size: usize,
}

impl fmt::Display for DownloadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

/// Persistence errors
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    #[error("Output location unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to save {filename}: {message}")]
    WriteFailed { filename: String, message: String },
}

/// Port for durable storage of finished recordings
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Store `bytes` under a name derived from `suggested_filename`.
    ///
    /// # Returns
    /// A handle describing where the bytes were stored
    async fn save(
        &self,
        bytes: Vec<u8>,
        suggested_filename: &str,
    ) -> Result<DownloadHandle, PersistenceError>;
}
