//! Audio source port interfaces

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque identifier of a capturable audio source.
///
/// The core never interprets it; adapters decide what it names (a host input
/// device, a tone generator, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceHandle(String);

impl SourceHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SourceHandle {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.trim()))
    }
}

/// Acquisition errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    #[error("Audio source not found: {0}")]
    NotFound(String),

    #[error("Permission denied for audio source: {0}")]
    PermissionDenied(String),

    #[error("Audio source unavailable: {0}")]
    Unavailable(String),

    #[error("Audio source failed during capture: {0}")]
    StreamFailed(String),
}

/// Callback invoked once per audio frame with mono f32 samples.
///
/// Runs on the host audio thread: it must not block.
pub type FrameSink = Box<dyn FnMut(&[f32]) + Send + 'static>;

/// Callback for failures after acquisition (device unplugged, backend error).
///
/// May be invoked from the host audio thread and more than once.
pub type FaultSink = Box<dyn FnMut(AcquisitionError) + Send + 'static>;

/// A live audio stream delivering frames to its [`FrameSink`]
pub trait AudioStream: Send + Sync {
    /// Sample rate of the delivered frames
    fn sample_rate(&self) -> u32;

    /// Stop frame delivery and release the source.
    /// No frame is in flight once this returns. May block briefly.
    fn close(self: Box<Self>);
}

/// Port for live audio capture
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Acquire `source` and start delivering frames to `sink`.
    /// Failures of the running stream are reported to `faults`.
    ///
    /// # Returns
    /// The running stream or the reason the source could not be acquired
    async fn acquire(
        &self,
        source: &SourceHandle,
        sink: FrameSink,
        faults: FaultSink,
    ) -> Result<Box<dyn AudioStream>, AcquisitionError>;
}
