//! Container encoder port interface

use thiserror::Error;

use crate::domain::recording::AudioMimeType;

/// Packaging errors
#[derive(Debug, Clone, Error)]
pub enum EncodeError {
    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("{format} encoding failed: {message}")]
    Encode {
        format: AudioMimeType,
        message: String,
    },
}

/// Port for packaging raw PCM into a container format.
///
/// Called off the async executor; implementations may be CPU heavy.
pub trait ContainerEncoder: Send + Sync {
    /// Mime type of the produced bytes
    fn mime_type(&self) -> AudioMimeType;

    /// Package mono 16-bit samples captured at `sample_rate`
    fn package(&self, pcm: &[i16], sample_rate: u32) -> Result<Vec<u8>, EncodeError>;
}

impl<E: ContainerEncoder + ?Sized> ContainerEncoder for Box<E> {
    fn mime_type(&self) -> AudioMimeType {
        (**self).mime_type()
    }

    fn package(&self, pcm: &[i16], sample_rate: u32) -> Result<Vec<u8>, EncodeError> {
        (**self).package(pcm, sample_rate)
    }
}
