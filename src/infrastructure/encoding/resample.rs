//! Sample-rate conversion in front of a container encoder

use rubato::{FftFixedIn, Resampler};

use crate::application::ports::{ContainerEncoder, EncodeError};
use crate::domain::recording::AudioMimeType;

/// Input frames per resampler call
const CHUNK_SIZE: usize = 1024;

/// Wraps an encoder so everything it packages is first converted to
/// `target_rate`
#[derive(Debug, Clone)]
pub struct ResamplingEncoder<E> {
    inner: E,
    target_rate: u32,
}

impl<E: ContainerEncoder> ResamplingEncoder<E> {
    pub fn new(inner: E, target_rate: u32) -> Self {
        Self { inner, target_rate }
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }
}

impl<E: ContainerEncoder> ContainerEncoder for ResamplingEncoder<E> {
    fn mime_type(&self) -> AudioMimeType {
        self.inner.mime_type()
    }

    fn package(&self, pcm: &[i16], sample_rate: u32) -> Result<Vec<u8>, EncodeError> {
        let resampled = resample(pcm, sample_rate, self.target_rate)?;
        self.inner.package(&resampled, self.target_rate)
    }
}

/// Resample mono PCM from `source_rate` to `target_rate`
pub fn resample(samples: &[i16], source_rate: u32, target_rate: u32) -> Result<Vec<i16>, EncodeError> {
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    // Convert i16 to f32 for resampling
    let samples_f32: Vec<f32> = samples.iter().map(|&s| s as f32 / 32768.0).collect();

    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = (samples_f32.len() as f64 * ratio).ceil() as usize;

    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        CHUNK_SIZE,
        2, // Sub-chunks
        1, // Mono
    )
    .map_err(|e| EncodeError::Resample(format!("init failed: {}", e)))?;

    let mut output = Vec::with_capacity(output_len);
    let mut input_pos = 0;

    while input_pos < samples_f32.len() {
        let frames_needed = resampler.input_frames_next();
        let end_pos = (input_pos + frames_needed).min(samples_f32.len());

        // Zero-pad the final partial chunk
        let mut padded = samples_f32[input_pos..end_pos].to_vec();
        padded.resize(frames_needed, 0.0);
        let chunk = vec![padded];

        let resampled = resampler
            .process(&chunk, None)
            .map_err(|e| EncodeError::Resample(e.to_string()))?;

        output.extend(
            resampled[0]
                .iter()
                .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16),
        );
        input_pos = end_pos;
    }

    // Trim to expected output length
    output.truncate(output_len);

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::encoding::WavEncoder;

    #[test]
    fn same_rate_is_passthrough() {
        let pcm = vec![1i16, 2, 3];
        assert_eq!(resample(&pcm, 16_000, 16_000).unwrap(), pcm);
    }

    #[test]
    fn downsampling_shrinks_output() {
        let pcm = vec![0i16; 48_000];
        let out = resample(&pcm, 48_000, 16_000).unwrap();
        assert!(out.len() <= 16_000);
        assert!(out.len() > 15_000);
    }

    #[test]
    fn wrapped_encoder_uses_target_rate() {
        let encoder = ResamplingEncoder::new(WavEncoder::new(), 16_000);
        assert_eq!(encoder.mime_type(), AudioMimeType::Wav);

        let bytes = encoder.package(&vec![0i16; 48_000], 48_000).unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
    }
}
