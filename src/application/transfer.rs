//! Transfer protocol: ships a finished artifact across the message boundary
//! as ordered, size-bounded chunks

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::protocol::CaptureEvent;
use crate::domain::config::RecorderConfig;
use crate::domain::error::EmptyRecordingError;
use crate::domain::recording::Artifact;
use crate::domain::transfer::{Chunker, RecordingId, DEFAULT_CHUNK_CAP};

/// Transfer errors
#[derive(Debug, Clone, Error)]
pub enum TransferError {
    #[error(transparent)]
    Empty(#[from] EmptyRecordingError),

    #[error("Transfer channel closed after {sent} of {total} chunks")]
    ChannelClosed { sent: usize, total: usize },
}

/// Splits artifacts into chunks and sends them in ascending index order.
/// No retries: a closed channel ends the transfer.
#[derive(Debug, Clone)]
pub struct TransferProtocol {
    chunk_cap: usize,
    legacy_single_message: bool,
}

impl TransferProtocol {
    /// `chunk_cap` is clamped to at least one byte
    pub fn new(chunk_cap: usize) -> Self {
        Self {
            chunk_cap: chunk_cap.max(1),
            legacy_single_message: false,
        }
    }

    pub fn from_config(config: &RecorderConfig) -> Self {
        Self::new(config.chunk_cap).with_legacy_single_message(config.legacy_single_message)
    }

    /// Send artifacts that fit in one chunk as a single `SaveRecording`
    pub fn with_legacy_single_message(mut self, enabled: bool) -> Self {
        self.legacy_single_message = enabled;
        self
    }

    pub fn chunk_cap(&self) -> usize {
        self.chunk_cap
    }

    /// Split without sending
    pub fn split(&self, artifact: Artifact, recording_id: RecordingId) -> Chunker {
        Chunker::new(artifact, recording_id, self.chunk_cap)
    }

    /// Send `artifact` over `events`, consuming it.
    ///
    /// # Returns
    /// The number of messages sent
    pub async fn send(
        &self,
        artifact: Artifact,
        recording_id: RecordingId,
        events: &mpsc::Sender<CaptureEvent>,
    ) -> Result<usize, TransferError> {
        if artifact.is_empty() {
            return Err(EmptyRecordingError.into());
        }

        if self.legacy_single_message && artifact.len() <= self.chunk_cap {
            debug!(recording = %recording_id, size = artifact.len(), "Sending single-message recording");
            let mime_type = artifact.mime_type();
            let event = CaptureEvent::SaveRecording {
                payload: artifact.into_bytes(),
                mime_type,
            };
            events
                .send(event)
                .await
                .map_err(|_| TransferError::ChannelClosed { sent: 0, total: 1 })?;
            return Ok(1);
        }

        let size = artifact.len();
        let chunks = self.split(artifact, recording_id.clone());
        let total = chunks.total_count();
        info!(recording = %recording_id, size, chunks = total, "Transferring recording");

        for (sent, chunk) in chunks.enumerate() {
            debug!(recording = %recording_id, index = chunk.index, len = chunk.payload.len(), "Sending chunk");
            events
                .send(CaptureEvent::SaveRecordingChunk(chunk))
                .await
                .map_err(|_| TransferError::ChannelClosed { sent, total })?;
        }

        Ok(total)
    }
}

impl Default for TransferProtocol {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_CAP)
    }
}
