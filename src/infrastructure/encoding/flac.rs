//! FLAC container via flacenc
//!
//! Lossless, typically ~40-60% of the WAV size for speech.

use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::config;
use flacenc::error::Verify;
use flacenc::source::MemSource;

use crate::application::ports::{ContainerEncoder, EncodeError};
use crate::domain::recording::AudioMimeType;

/// Bits per sample (16-bit audio)
const BITS_PER_SAMPLE: usize = 16;

/// Number of channels (mono)
const CHANNELS: usize = 1;

/// Packages PCM as a mono 16-bit FLAC stream
#[derive(Debug, Default, Clone, Copy)]
pub struct FlacEncoder;

impl FlacEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl ContainerEncoder for FlacEncoder {
    fn mime_type(&self) -> AudioMimeType {
        AudioMimeType::Flac
    }

    fn package(&self, pcm: &[i16], sample_rate: u32) -> Result<Vec<u8>, EncodeError> {
        let err = |message: String| EncodeError::Encode {
            format: AudioMimeType::Flac,
            message,
        };

        // flacenc works on i32 samples
        let samples: Vec<i32> = pcm.iter().map(|&s| s as i32).collect();

        let config = config::Encoder::default()
            .into_verified()
            .map_err(|(_, e)| err(format!("config: {:?}", e)))?;

        let source = MemSource::from_samples(&samples, CHANNELS, BITS_PER_SAMPLE, sample_rate as usize);

        let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
            .map_err(|e| err(format!("{:?}", e)))?;

        let mut sink = ByteSink::new();
        stream
            .write(&mut sink)
            .map_err(|e| err(e.to_string()))?;

        Ok(sink.into_inner())
    }
}
