//! Application configuration value object

use serde::{Deserialize, Serialize};

use crate::domain::recording::segment::DEFAULT_SEGMENT_MEMORY_LIMIT;
use crate::domain::recording::{AudioMimeType, Duration};
use crate::domain::transfer::{DEFAULT_CHUNK_CAP, DEFAULT_MAX_MESSAGE_BYTES};

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub max_duration: Option<String>,
    pub format: Option<String>,
    pub sample_rate: Option<u32>,
    pub output_dir: Option<String>,
    pub chunk_cap: Option<usize>,
    pub max_message_bytes: Option<usize>,
    pub segment_memory_limit: Option<usize>,
    pub stale_buffer_timeout: Option<String>,
    pub legacy_single_message: Option<bool>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            max_duration: Some(Duration::default_max_duration().to_string()),
            format: Some(AudioMimeType::default().extension().to_string()),
            sample_rate: None,
            output_dir: None,
            chunk_cap: Some(DEFAULT_CHUNK_CAP),
            max_message_bytes: Some(DEFAULT_MAX_MESSAGE_BYTES),
            segment_memory_limit: Some(DEFAULT_SEGMENT_MEMORY_LIMIT),
            stale_buffer_timeout: Some(Duration::default_stale_buffer().to_string()),
            legacy_single_message: Some(false),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            max_duration: other.max_duration.or(self.max_duration),
            format: other.format.or(self.format),
            sample_rate: other.sample_rate.or(self.sample_rate),
            output_dir: other.output_dir.or(self.output_dir),
            chunk_cap: other.chunk_cap.or(self.chunk_cap),
            max_message_bytes: other.max_message_bytes.or(self.max_message_bytes),
            segment_memory_limit: other.segment_memory_limit.or(self.segment_memory_limit),
            stale_buffer_timeout: other.stale_buffer_timeout.or(self.stale_buffer_timeout),
            legacy_single_message: other.legacy_single_message.or(self.legacy_single_message),
        }
    }

    /// Get max_duration as parsed Duration, or default if not set/invalid
    pub fn max_duration_or_default(&self) -> Duration {
        self.max_duration
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_max_duration)
    }

    /// Get format as parsed mime type, or WAV if not set/invalid
    pub fn format_or_default(&self) -> AudioMimeType {
        self.format
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Get stale_buffer_timeout as parsed Duration, or default if not set/invalid
    pub fn stale_buffer_timeout_or_default(&self) -> Duration {
        self.stale_buffer_timeout
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_stale_buffer)
    }

    pub fn chunk_cap_or_default(&self) -> usize {
        self.chunk_cap.unwrap_or(DEFAULT_CHUNK_CAP)
    }

    pub fn max_message_bytes_or_default(&self) -> usize {
        self.max_message_bytes.unwrap_or(DEFAULT_MAX_MESSAGE_BYTES)
    }

    pub fn segment_memory_limit_or_default(&self) -> usize {
        self.segment_memory_limit
            .unwrap_or(DEFAULT_SEGMENT_MEMORY_LIMIT)
    }

    /// Get legacy_single_message setting, or false if not set
    pub fn legacy_single_message_or_default(&self) -> bool {
        self.legacy_single_message.unwrap_or(false)
    }
}
