//! Real-time segment encoding and the bounded segment buffer
//!
//! The frame callback of the host audio subsystem feeds `SegmentEncoder`,
//! which converts float samples to 16-bit PCM into a pre-allocated block and
//! emits one `EncodedSegment` each time the block fills. Segments accumulate in
//! a `SegmentBuffer` that evicts the oldest entries once its byte budget is
//! exceeded.
//!
//! # Memory Budget
//!
//! At 48kHz mono PCM16 with 4096-sample blocks:
//! - Segment size: 4096 samples × 2 bytes = 8 KiB (~85ms)
//! - 90 seconds: ~1055 segments, ~8.2 MiB

use std::collections::VecDeque;

/// Samples per segment (matches a 4096-frame worklet buffer)
pub const DEFAULT_BLOCK_SAMPLES: usize = 4096;

/// Default byte budget for buffered segments (32 MiB)
pub const DEFAULT_SEGMENT_MEMORY_LIMIT: usize = 32 * 1024 * 1024;

/// Bytes per encoded sample (16-bit PCM)
pub const BYTES_PER_SAMPLE: usize = 2;

/// Convert a float sample to 16-bit PCM.
///
/// Input is clamped to [-1, 1]; negative values scale by 0x8000 and positive
/// values by 0x7FFF so both extremes map exactly onto the i16 range.
pub fn sample_to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// One block of encoder output: little-endian 16-bit mono PCM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSegment(Vec<u8>);

impl EncodedSegment {
    fn from_samples(samples: &[i16]) -> Self {
        let mut bytes = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-frame encoder with bounded work per call.
///
/// Thread-safety: not internally synchronized; the capture engine guards it
/// together with the segment buffer.
#[derive(Debug)]
pub struct SegmentEncoder {
    block: Vec<i16>,
    block_samples: usize,
}

impl SegmentEncoder {
    pub fn new(block_samples: usize) -> Self {
        let block_samples = block_samples.max(1);
        Self {
            block: Vec::with_capacity(block_samples),
            block_samples,
        }
    }

    /// Encode one frame of mono float samples.
    ///
    /// Every block that fills up during this call is handed to `emit`.
    pub fn encode_frame(&mut self, samples: &[f32], mut emit: impl FnMut(EncodedSegment)) {
        for &sample in samples {
            self.block.push(sample_to_i16(sample));
            if self.block.len() == self.block_samples {
                emit(EncodedSegment::from_samples(&self.block));
                self.block.clear();
            }
        }
    }

    /// Emit whatever partial block is pending
    pub fn flush(&mut self) -> Option<EncodedSegment> {
        if self.block.is_empty() {
            return None;
        }
        let segment = EncodedSegment::from_samples(&self.block);
        self.block.clear();
        Some(segment)
    }

    /// Samples waiting for the current block to fill
    pub fn pending_samples(&self) -> usize {
        self.block.len()
    }
}

impl Default for SegmentEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SAMPLES)
    }
}

/// Ordered segment store with a byte budget.
///
/// When a push takes the total over `max_bytes`, the oldest segments are
/// dropped until it fits again. The newest segment is always kept.
#[derive(Debug)]
pub struct SegmentBuffer {
    segments: VecDeque<EncodedSegment>,
    total_bytes: usize,
    max_bytes: usize,
    evicted_segments: u64,
    evicted_bytes: u64,
}

impl SegmentBuffer {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            segments: VecDeque::new(),
            total_bytes: 0,
            max_bytes,
            evicted_segments: 0,
            evicted_bytes: 0,
        }
    }

    /// Append a segment, evicting from the front if over budget
    pub fn push(&mut self, segment: EncodedSegment) {
        self.total_bytes += segment.len();
        self.segments.push_back(segment);

        while self.total_bytes > self.max_bytes && self.segments.len() > 1 {
            if let Some(oldest) = self.segments.pop_front() {
                self.total_bytes -= oldest.len();
                self.evicted_segments += 1;
                self.evicted_bytes += oldest.len() as u64;
            }
        }
    }

    /// Move all segments out in production order, leaving the buffer empty.
    /// O(1): no audio bytes are copied.
    pub fn take_segments(&mut self) -> VecDeque<EncodedSegment> {
        self.total_bytes = 0;
        std::mem::take(&mut self.segments)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn evicted_segments(&self) -> u64 {
        self.evicted_segments
    }

    pub fn evicted_bytes(&self) -> u64 {
        self.evicted_bytes
    }
}

/// Concatenate segments into one PCM byte sequence
pub fn concat_segments(segments: impl IntoIterator<Item = EncodedSegment>) -> Vec<u8> {
    let segments: Vec<EncodedSegment> = segments.into_iter().collect();
    let mut bytes = Vec::with_capacity(segments.iter().map(EncodedSegment::len).sum());
    for segment in segments {
        bytes.extend_from_slice(segment.as_bytes());
    }
    bytes
}

/// Decode concatenated segment bytes back into samples
pub fn pcm_from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_segments_empties_without_copying() {
        let mut encoder = SegmentEncoder::new(2);
        let mut buffer = SegmentBuffer::new(1024);
        encoder.encode_frame(&[0.5, -0.5, 1.0, -1.0], |segment| buffer.push(segment));

        let segments = buffer.take_segments();
        assert_eq!(segments.len(), 2);
        assert!(buffer.is_empty());
        assert_eq!(buffer.total_bytes(), 0);

        let pcm = pcm_from_le_bytes(&concat_segments(segments));
        assert_eq!(pcm, vec![16383, -16384, 32767, -32768]);
    }

    #[test]
    fn sample_conversion_clamps_and_scales() {
        assert_eq!(sample_to_i16(0.0), 0);
        assert_eq!(sample_to_i16(1.0), i16::MAX);
        assert_eq!(sample_to_i16(-1.0), i16::MIN);
        assert_eq!(sample_to_i16(4.0), i16::MAX);
        assert_eq!(sample_to_i16(-4.0), i16::MIN);
        assert_eq!(sample_to_i16(0.5), 16383);
    }

    #[test]
    fn encoder_emits_only_full_blocks() {
        let mut encoder = SegmentEncoder::new(4);
        let mut emitted = Vec::new();

        encoder.encode_frame(&[0.0; 3], |s| emitted.push(s));
        assert!(emitted.is_empty());
        assert_eq!(encoder.pending_samples(), 3);

        encoder.encode_frame(&[0.0; 6], |s| emitted.push(s));
        assert_eq!(emitted.len(), 2);
        assert!(emitted.iter().all(|s| s.len() == 4 * BYTES_PER_SAMPLE));
        assert_eq!(encoder.pending_samples(), 1);
    }

    #[test]
    fn flush_returns_partial_block_once() {
        let mut encoder = SegmentEncoder::new(8);
        encoder.encode_frame(&[0.25, -0.25], |_| panic!("block not full yet"));

        let tail = encoder.flush().unwrap();
        assert_eq!(tail.len(), 2 * BYTES_PER_SAMPLE);
        assert!(encoder.flush().is_none());
    }

    #[test]
    fn segments_round_trip_through_bytes() {
        let mut encoder = SegmentEncoder::new(2);
        let mut buffer = SegmentBuffer::new(usize::MAX);
        encoder.encode_frame(&[1.0, -1.0, 0.0], |s| buffer.push(s));
        if let Some(tail) = encoder.flush() {
            buffer.push(tail);
        }

        let pcm = pcm_from_le_bytes(&concat_segments(buffer.take_segments()));
        assert_eq!(pcm, vec![i16::MAX, i16::MIN, 0]);
        assert!(buffer.is_empty());
        assert_eq!(buffer.total_bytes(), 0);
    }

    #[test]
    fn buffer_evicts_oldest_when_over_budget() {
        let mut encoder = SegmentEncoder::new(1);
        // Budget for exactly three one-sample segments
        let mut buffer = SegmentBuffer::new(3 * BYTES_PER_SAMPLE);

        let frame: Vec<f32> = (1..=5).map(|i| i as f32 / 10.0).collect();
        encoder.encode_frame(&frame, |s| buffer.push(s));

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.evicted_segments(), 2);
        assert_eq!(buffer.evicted_bytes(), 2 * BYTES_PER_SAMPLE as u64);

        // The survivors are the newest three, in order
        let pcm = pcm_from_le_bytes(&concat_segments(buffer.take_segments()));
        let expected: Vec<i16> = frame[2..].iter().map(|&s| sample_to_i16(s)).collect();
        assert_eq!(pcm, expected);
    }

    #[test]
    fn buffer_keeps_newest_segment_even_if_oversized() {
        let mut buffer = SegmentBuffer::new(1);
        buffer.push(EncodedSegment::from_samples(&[1, 2, 3]));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.evicted_segments(), 0);
    }
}
