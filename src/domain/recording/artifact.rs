//! Finished recording artifact value object

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::InvalidFormatError;

/// Container formats the capture engine can package a recording into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AudioMimeType {
    #[default]
    #[serde(rename = "audio/wav")]
    Wav,
    #[serde(rename = "audio/flac")]
    Flac,
}

impl AudioMimeType {
    /// Get the MIME type string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Flac => "audio/flac",
        }
    }

    /// Get the file extension
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Flac => "flac",
        }
    }
}

impl fmt::Display for AudioMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AudioMimeType {
    type Err = InvalidFormatError;

    /// Accepts either the short format name ("wav") or the MIME string ("audio/wav")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wav" | "audio/wav" => Ok(Self::Wav),
            "flac" | "audio/flac" => Ok(Self::Flac),
            _ => Err(InvalidFormatError {
                input: s.to_string(),
            }),
        }
    }
}

/// The complete encoded byte sequence of one session.
/// Produced once at finalize and consumed once by the transfer protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    bytes: Vec<u8>,
    mime_type: AudioMimeType,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>, mime_type: AudioMimeType) -> Self {
        Self { bytes, mime_type }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume and return the encoded bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn mime_type(&self) -> AudioMimeType {
        self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Get human-readable size
    pub fn human_readable_size(&self) -> String {
        human_readable_size(self.len())
    }
}

/// Format a byte count for log and CLI output
pub fn human_readable_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// File name a finished recording is saved under.
///
/// `recording-2026-10-16T09-41-07-512Z.wav`: the session start time in UTC with
/// `:` and `.` replaced so the name is valid on every filesystem.
pub fn recording_filename(started_at: DateTime<Utc>, mime_type: AudioMimeType) -> String {
    format!(
        "recording-{}.{}",
        filename_timestamp(started_at),
        mime_type.extension()
    )
}

/// Timestamp fragment embedded in recording file names
pub fn filename_timestamp(started_at: DateTime<Utc>) -> String {
    started_at.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}
