//! Container encoders
//!
//! Raw PCM segments are packaged into WAV (hound) or FLAC (flacenc) at
//! finalize, optionally resampled first.

mod flac;
mod resample;
mod wav;

pub use flac::FlacEncoder;
pub use resample::{resample, ResamplingEncoder};
pub use wav::WavEncoder;

use crate::application::ports::ContainerEncoder;
use crate::domain::recording::AudioMimeType;

/// Create the encoder for `format`, resampling to `sample_rate` when set
pub fn create_encoder(format: AudioMimeType, sample_rate: Option<u32>) -> Box<dyn ContainerEncoder> {
    match (format, sample_rate) {
        (AudioMimeType::Wav, None) => Box::new(WavEncoder::new()),
        (AudioMimeType::Flac, None) => Box::new(FlacEncoder::new()),
        (AudioMimeType::Wav, Some(rate)) => Box::new(ResamplingEncoder::new(WavEncoder::new(), rate)),
        (AudioMimeType::Flac, Some(rate)) => {
            Box::new(ResamplingEncoder::new(FlacEncoder::new(), rate))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_matches_format() {
        assert_eq!(create_encoder(AudioMimeType::Wav, None).mime_type(), AudioMimeType::Wav);
        assert_eq!(
            create_encoder(AudioMimeType::Flac, Some(16_000)).mime_type(),
            AudioMimeType::Flac
        );
    }
}
