//! Validated recorder settings

use crate::domain::error::ConfigError;
use crate::domain::recording::segment::{BYTES_PER_SAMPLE, DEFAULT_BLOCK_SAMPLES};
use crate::domain::recording::{AudioMimeType, Duration};
use crate::domain::transfer::{base64_len, max_chunk_cap, ENVELOPE_OVERHEAD};

use super::AppConfig;

/// Lowest and highest accepted packaging sample rates
pub const SAMPLE_RATE_RANGE: std::ops::RangeInclusive<u32> = 8_000..=192_000;

/// Settings consumed by the capture engine, transfer protocol and controller.
///
/// Unlike [`AppConfig`], every value here is present and checked.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfig {
    /// Auto-stop deadline armed at acquisition
    pub max_duration: Duration,
    /// Container the artifact is packaged in
    pub format: AudioMimeType,
    /// Resample to this rate at packaging time; `None` keeps the source rate
    pub sample_rate: Option<u32>,
    pub block_samples: usize,
    pub chunk_cap: usize,
    pub max_message_bytes: usize,
    pub segment_memory_limit: usize,
    pub stale_buffer_timeout: Duration,
    pub legacy_single_message: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        let app = AppConfig::empty();
        Self {
            max_duration: app.max_duration_or_default(),
            format: app.format_or_default(),
            sample_rate: None,
            block_samples: DEFAULT_BLOCK_SAMPLES,
            chunk_cap: app.chunk_cap_or_default(),
            max_message_bytes: app.max_message_bytes_or_default(),
            segment_memory_limit: app.segment_memory_limit_or_default(),
            stale_buffer_timeout: app.stale_buffer_timeout_or_default(),
            legacy_single_message: false,
        }
    }
}

impl RecorderConfig {
    /// Build from a merged config, rejecting malformed or inconsistent values
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let max_duration = match config.max_duration.as_deref() {
            Some(s) => s.parse().map_err(|e| invalid("max_duration", e))?,
            None => Duration::default_max_duration(),
        };
        let stale_buffer_timeout = match config.stale_buffer_timeout.as_deref() {
            Some(s) => s.parse().map_err(|e| invalid("stale_buffer_timeout", e))?,
            None => Duration::default_stale_buffer(),
        };
        let format = match config.format.as_deref() {
            Some(s) => s.parse().map_err(|e| invalid("format", e))?,
            None => AudioMimeType::default(),
        };

        let recorder = Self {
            max_duration,
            format,
            sample_rate: config.sample_rate,
            block_samples: DEFAULT_BLOCK_SAMPLES,
            chunk_cap: config.chunk_cap_or_default(),
            max_message_bytes: config.max_message_bytes_or_default(),
            segment_memory_limit: config.segment_memory_limit_or_default(),
            stale_buffer_timeout,
            legacy_single_message: config.legacy_single_message_or_default(),
        };
        recorder.validate()?;
        Ok(recorder)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_cap == 0 {
            return Err(invalid("chunk_cap", "must be at least 1 byte"));
        }
        if base64_len(self.chunk_cap) + ENVELOPE_OVERHEAD > self.max_message_bytes {
            return Err(invalid(
                "chunk_cap",
                format!(
                    "{} bytes does not fit a {} byte message once encoded (largest allowed: {})",
                    self.chunk_cap,
                    self.max_message_bytes,
                    max_chunk_cap(self.max_message_bytes)
                ),
            ));
        }
        if self.block_samples == 0 {
            return Err(invalid("block_samples", "must be at least 1 sample"));
        }
        let block_bytes = self.block_samples * BYTES_PER_SAMPLE;
        if self.segment_memory_limit < block_bytes {
            return Err(invalid(
                "segment_memory_limit",
                format!("must hold at least one {} byte segment", block_bytes),
            ));
        }
        if let Some(rate) = self.sample_rate {
            if !SAMPLE_RATE_RANGE.contains(&rate) {
                return Err(invalid(
                    "sample_rate",
                    format!(
                        "{} Hz is outside {}..={} Hz",
                        rate,
                        SAMPLE_RATE_RANGE.start(),
                        SAMPLE_RATE_RANGE.end()
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, message: impl ToString) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.to_string(),
    }
}
