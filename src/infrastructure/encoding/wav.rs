//! WAV container via hound

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::application::ports::{ContainerEncoder, EncodeError};
use crate::domain::recording::AudioMimeType;

/// Size of the canonical 16-bit PCM WAV header
const HEADER_LEN: usize = 44;

/// Packages PCM as a 16-bit mono WAV file
#[derive(Debug, Default, Clone, Copy)]
pub struct WavEncoder;

impl WavEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl ContainerEncoder for WavEncoder {
    fn mime_type(&self) -> AudioMimeType {
        AudioMimeType::Wav
    }

    fn package(&self, pcm: &[i16], sample_rate: u32) -> Result<Vec<u8>, EncodeError> {
        let err = |e: hound::Error| EncodeError::Encode {
            format: AudioMimeType::Wav,
            message: e.to_string(),
        };

        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::with_capacity(HEADER_LEN + pcm.len() * 2));
        {
            let mut writer = WavWriter::new(&mut cursor, spec).map_err(err)?;
            for &sample in pcm {
                writer.write_sample(sample).map_err(err)?;
            }
            writer.finalize().map_err(err)?;
        }
        Ok(cursor.into_inner())
    }
}
