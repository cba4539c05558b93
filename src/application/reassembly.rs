//! Reassembly store: turns chunks back into complete recordings

use std::collections::HashMap;
use std::time::Duration as StdDuration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::recording::{recording_filename, AudioMimeType};
use crate::domain::transfer::{Chunk, RecordingId};

/// Protocol violations detected while reassembling
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReassemblyError {
    #[error("Chunk {index} is out of range for recording {recording_id} with {total_count} chunks")]
    IndexOutOfRange {
        recording_id: RecordingId,
        index: usize,
        total_count: usize,
    },

    #[error("Recording {recording_id} declares zero chunks")]
    ZeroChunks { recording_id: RecordingId },

    #[error("Chunk count mismatch for recording {recording_id}: expected {expected}, got {actual}")]
    TotalMismatch {
        recording_id: RecordingId,
        expected: usize,
        actual: usize,
    },

    #[error("Recording {recording_id} abandoned after {received} of {total_count} chunks")]
    Stale {
        recording_id: RecordingId,
        received: usize,
        total_count: usize,
    },
}

/// A fully reassembled recording, ready for the persistence sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRecording {
    pub recording_id: RecordingId,
    pub bytes: Vec<u8>,
    pub mime_type: AudioMimeType,
}

impl CompletedRecording {
    /// File name derived from the session start time and container
    pub fn suggested_filename(&self) -> String {
        recording_filename(self.recording_id.started_at(), self.mime_type)
    }
}

/// Result of accepting one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Pending { received: usize, total_count: usize },
    Complete(CompletedRecording),
}

#[derive(Debug)]
struct ReassemblyBuffer {
    slots: Vec<Option<Vec<u8>>>,
    received: usize,
    mime_type: AudioMimeType,
    last_activity: Instant,
}

impl ReassemblyBuffer {
    fn new(total_count: usize, mime_type: AudioMimeType, now: Instant) -> Self {
        Self {
            slots: vec![None; total_count],
            received: 0,
            mime_type,
            last_activity: now,
        }
    }

    fn total_count(&self) -> usize {
        self.slots.len()
    }

    fn is_complete(&self) -> bool {
        self.received == self.slots.len()
    }

    fn concat(self) -> Vec<u8> {
        let len = self.slots.iter().flatten().map(Vec::len).sum();
        let mut bytes = Vec::with_capacity(len);
        for slot in self.slots.into_iter().flatten() {
            bytes.extend_from_slice(&slot);
        }
        bytes
    }
}

/// Per-recording chunk buffers, keyed by recording id.
///
/// Owned by the orchestrator context; each buffer lives until its recording
/// completes or goes stale.
#[derive(Debug, Default)]
pub struct ReassemblyStore {
    buffers: HashMap<RecordingId, ReassemblyBuffer>,
}

impl ReassemblyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recordings with at least one chunk received
    pub fn pending(&self) -> usize {
        self.buffers.len()
    }

    /// Accept one chunk.
    ///
    /// Rejected chunks leave any existing buffer untouched. A repeated index
    /// overwrites the earlier payload.
    pub fn on_chunk(&mut self, chunk: Chunk, now: Instant) -> Result<ChunkOutcome, ReassemblyError> {
        let Chunk {
            recording_id,
            index,
            total_count,
            payload,
            mime_type,
        } = chunk;

        if total_count == 0 {
            return Err(ReassemblyError::ZeroChunks { recording_id });
        }
        if index >= total_count {
            return Err(ReassemblyError::IndexOutOfRange {
                recording_id,
                index,
                total_count,
            });
        }

        let mut buffer = self
            .buffers
            .remove(&recording_id)
            .unwrap_or_else(|| ReassemblyBuffer::new(total_count, mime_type, now));

        if buffer.total_count() != total_count {
            let expected = buffer.total_count();
            self.buffers.insert(recording_id.clone(), buffer);
            return Err(ReassemblyError::TotalMismatch {
                recording_id,
                expected,
                actual: total_count,
            });
        }

        if buffer.slots[index].replace(payload).is_some() {
            warn!(recording = %recording_id, index, "Duplicate chunk, keeping the latest payload");
        } else {
            buffer.received += 1;
        }
        buffer.last_activity = now;

        if !buffer.is_complete() {
            let received = buffer.received;
            debug!(recording = %recording_id, index, received, total = total_count, "Chunk buffered");
            self.buffers.insert(recording_id, buffer);
            return Ok(ChunkOutcome::Pending {
                received,
                total_count,
            });
        }

        let mime_type = buffer.mime_type;
        Ok(ChunkOutcome::Complete(CompletedRecording {
            recording_id,
            bytes: buffer.concat(),
            mime_type,
        }))
    }

    /// Drop buffers idle for longer than `ttl`
    pub fn evict_stale(&mut self, now: Instant, ttl: StdDuration) -> Vec<ReassemblyError> {
        let stale: Vec<RecordingId> = self
            .buffers
            .iter()
            .filter(|(_, buffer)| now.saturating_duration_since(buffer.last_activity) > ttl)
            .map(|(id, _)| id.clone())
            .collect();

        stale
            .into_iter()
            .filter_map(|recording_id| {
                let buffer = self.buffers.remove(&recording_id)?;
                Some(ReassemblyError::Stale {
                    received: buffer.received,
                    total_count: buffer.total_count(),
                    recording_id,
                })
            })
            .collect()
    }
}
