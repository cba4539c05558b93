//! Messages exchanged between the requester, the session controller and the
//! capture engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::ports::{DownloadHandle, SourceHandle};
use crate::domain::recording::AudioMimeType;
use crate::domain::session::{SessionId, SessionState};
use crate::domain::transfer::{base64_payload, Chunk};

/// Outcome of a state-changing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ack {
    /// The request changed state
    Accepted,
    /// The request was a no-op in the current state
    Ignored,
}

/// Requester -> session controller
#[derive(Debug)]
pub enum Request {
    StartRecording {
        source: SourceHandle,
        ack: oneshot::Sender<Ack>,
    },
    StopRecording {
        ack: oneshot::Sender<Ack>,
    },
    GetStatus {
        reply: oneshot::Sender<StatusReport>,
    },
    ClearError {
        ack: oneshot::Sender<Ack>,
    },
}

/// Session controller -> capture engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureCommand {
    Start {
        session: SessionId,
        source: SourceHandle,
    },
    Stop {
        session: SessionId,
    },
}

/// Capture engine -> session controller.
///
/// Serialized form is a JSON object tagged by `action`, binary payloads as
/// base64 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureEvent {
    Started {
        session: SessionId,
        #[serde(rename = "startedAt")]
        started_at: DateTime<Utc>,
    },
    SaveRecordingChunk(Chunk),
    /// Whole artifact in one message (legacy single-message mode)
    SaveRecording {
        #[serde(with = "base64_payload")]
        payload: Vec<u8>,
        #[serde(rename = "mimeType")]
        mime_type: AudioMimeType,
    },
    Error {
        message: String,
    },
    Stopped {
        session: SessionId,
    },
}

impl CaptureEvent {
    /// Size of the serialized message in bytes
    pub fn wire_len(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }
}

/// Snapshot of the controller state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// True while starting or active
    pub is_recording: bool,
    pub state: SessionState,
    pub session: Option<SessionId>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_saved: Option<DownloadHandle>,
    pub saved_count: u64,
    /// Recordings received in part or waiting on the persistence sink
    pub pending_transfers: usize,
}
