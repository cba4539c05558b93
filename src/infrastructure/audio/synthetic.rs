//! Sine tone generator standing in for a live source
//!
//! Handles: `synthetic` (440 Hz) or `synthetic:<hz>`.

use std::f32::consts::PI;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::application::ports::{
    AcquisitionError, AudioSource, AudioStream, FaultSink, FrameSink, SourceHandle,
};

/// Handle prefix routed to this source
pub const SYNTHETIC_PREFIX: &str = "synthetic";

const DEFAULT_FREQUENCY: f32 = 440.0;
const DEFAULT_SAMPLE_RATE: u32 = 16_000;
const FRAME_PERIOD: StdDuration = StdDuration::from_millis(20);
const AMPLITUDE: f32 = 0.5;

/// Generates a tone in real time, one frame every 20 ms
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    sample_rate: u32,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::with_sample_rate(DEFAULT_SAMPLE_RATE)
    }

    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// True if `handle` names this source
    pub fn handles(handle: &SourceHandle) -> bool {
        let s = handle.as_str();
        s == SYNTHETIC_PREFIX || s.starts_with("synthetic:")
    }

    /// Tone frequency requested by `handle`
    fn frequency(&self, handle: &SourceHandle) -> Result<f32, AcquisitionError> {
        let not_found = || AcquisitionError::NotFound(handle.to_string());
        let s = handle.as_str();
        if s == SYNTHETIC_PREFIX {
            return Ok(DEFAULT_FREQUENCY);
        }

        let hz: f32 = s
            .strip_prefix("synthetic:")
            .ok_or_else(not_found)?
            .parse()
            .map_err(|_| not_found())?;
        let nyquist = self.sample_rate as f32 / 2.0;
        if !hz.is_finite() || hz <= 0.0 || hz >= nyquist {
            return Err(not_found());
        }
        Ok(hz)
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSource for SyntheticSource {
    async fn acquire(
        &self,
        source: &SourceHandle,
        sink: FrameSink,
        _faults: FaultSink,
    ) -> Result<Box<dyn AudioStream>, AcquisitionError> {
        // A tone generator has no failure modes once running
        let frequency = self.frequency(source)?;
        let sample_rate = self.sample_rate;
        let frame_len = (sample_rate as u128 * FRAME_PERIOD.as_millis() / 1000) as usize;

        let sink = Arc::new(StdMutex::new(Some(sink)));
        let task_sink = Arc::clone(&sink);

        let task = tokio::spawn(async move {
            let mut ticker = interval(FRAME_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
            let step = 2.0 * PI * frequency / sample_rate as f32;
            let mut phase = 0.0f32;
            let mut frame = vec![0.0f32; frame_len];

            loop {
                ticker.tick().await;
                for sample in frame.iter_mut() {
                    *sample = AMPLITUDE * phase.sin();
                    phase = (phase + step) % (2.0 * PI);
                }
                let mut guard = task_sink.lock().unwrap_or_else(PoisonError::into_inner);
                match guard.as_mut() {
                    Some(deliver) => deliver(&frame),
                    None => break,
                }
            }
        });

        Ok(Box::new(SyntheticStream {
            sample_rate,
            sink,
            task,
        }))
    }
}

struct SyntheticStream {
    sample_rate: u32,
    sink: Arc<StdMutex<Option<FrameSink>>>,
    task: JoinHandle<()>,
}

impl AudioStream for SyntheticStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn close(self: Box<Self>) {
        // Frames are delivered under this lock
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_handles() {
        assert!(SyntheticSource::handles(&SourceHandle::new("synthetic")));
        assert!(SyntheticSource::handles(&SourceHandle::new("synthetic:1000")));
        assert!(!SyntheticSource::handles(&SourceHandle::new("default")));
        assert!(!SyntheticSource::handles(&SourceHandle::new("synthetics")));
    }

    #[test]
    fn parses_frequency() {
        let source = SyntheticSource::new();
        assert_eq!(
            source.frequency(&SourceHandle::new("synthetic")).unwrap(),
            440.0
        );
        assert_eq!(
            source.frequency(&SourceHandle::new("synthetic:1000")).unwrap(),
            1000.0
        );
    }

    #[test]
    fn rejects_bad_frequency() {
        let source = SyntheticSource::new();
        for handle in ["synthetic:", "synthetic:abc", "synthetic:0", "synthetic:9000", "tab-3"] {
            assert!(
                matches!(
                    source.frequency(&SourceHandle::new(handle)),
                    Err(AcquisitionError::NotFound(_))
                ),
                "{} should be rejected",
                handle
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_frames_until_closed() {
        let received = Arc::new(StdMutex::new(0usize));
        let counter = Arc::clone(&received);
        let sink: FrameSink = Box::new(move |frame: &[f32]| {
            assert!(frame.iter().all(|s| s.abs() <= AMPLITUDE));
            *counter.lock().unwrap() += frame.len();
        });

        let stream = SyntheticSource::new()
            .acquire(&SourceHandle::new("synthetic"), sink, Box::new(|_| {}))
            .await
            .unwrap();
        assert_eq!(stream.sample_rate(), 16_000);

        tokio::time::sleep(StdDuration::from_millis(1000)).await;
        stream.close();
        let after_close = *received.lock().unwrap();
        assert!(after_close >= 15_000, "got {} samples", after_close);

        tokio::time::sleep(StdDuration::from_millis(500)).await;
        assert_eq!(*received.lock().unwrap(), after_close);
    }
}
