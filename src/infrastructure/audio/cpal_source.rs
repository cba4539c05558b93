//! Host audio input using cpal
//!
//! The cpal stream is not `Send`, so each acquisition gets a dedicated thread
//! that builds the stream, plays it, and drops it when asked to stop.

use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::application::ports::{
    AcquisitionError, AudioSource, AudioStream, FaultSink, FrameSink, SourceHandle,
};

/// Handle that selects the host's default input device
pub const DEFAULT_DEVICE: &str = "default";

/// Capture rate used when the device supports it
const PREFERRED_SAMPLE_RATE: u32 = 48_000;

/// Audio source backed by the host's input devices
#[derive(Debug, Default)]
pub struct CpalSource;

impl CpalSource {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a handle to an input device: `default` or a device name
    fn find_device(handle: &SourceHandle) -> Result<cpal::Device, AcquisitionError> {
        let host = cpal::default_host();

        if handle.as_str() == DEFAULT_DEVICE {
            return host
                .default_input_device()
                .ok_or_else(|| AcquisitionError::NotFound(handle.to_string()));
        }

        let devices = host
            .input_devices()
            .map_err(|e| AcquisitionError::Unavailable(e.to_string()))?;
        for device in devices {
            if device.name().map(|name| name == handle.as_str()).unwrap_or(false) {
                return Ok(device);
            }
        }
        Err(AcquisitionError::NotFound(handle.to_string()))
    }

    /// Get a suitable input configuration
    fn input_config(
        device: &cpal::Device,
    ) -> Result<(StreamConfig, SampleFormat), AcquisitionError> {
        let supported_configs = device
            .supported_input_configs()
            .map_err(|e| classify(format!("Failed to get configs: {}", e)))?;

        // Prefer mono, but accept more channels (we'll mix down)
        let mut best_config: Option<cpal::SupportedStreamConfigRange> = None;

        for config in supported_configs {
            // Only consider i16 or f32 formats
            if config.sample_format() != SampleFormat::I16
                && config.sample_format() != SampleFormat::F32
            {
                continue;
            }

            let is_better = match &best_config {
                None => true,
                Some(current) => {
                    let fewer_channels = config.channels() < current.channels();
                    let prefers_float = config.channels() == current.channels()
                        && config.sample_format() == SampleFormat::F32
                        && current.sample_format() != SampleFormat::F32;
                    fewer_channels || prefers_float
                }
            };
            if is_better {
                best_config = Some(config);
            }
        }

        let config_range = best_config.ok_or_else(|| {
            AcquisitionError::Unavailable("No i16 or f32 input configuration".into())
        })?;

        let sample_rate = if config_range.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
            && config_range.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
        {
            SampleRate(PREFERRED_SAMPLE_RATE)
        } else {
            config_range.max_sample_rate()
        };

        let sample_format = config_range.sample_format();
        let config = StreamConfig {
            channels: config_range.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        Ok((config, sample_format))
    }

    /// Build and play a stream on the current thread
    fn open_stream(
        handle: &SourceHandle,
        mut sink: FrameSink,
        mut faults: FaultSink,
    ) -> Result<(cpal::Stream, u32), AcquisitionError> {
        let device = Self::find_device(handle)?;
        let (config, sample_format) = Self::input_config(&device)?;
        let channels = config.channels;
        let on_error = move |err: cpal::StreamError| {
            error!(error = %err, "Audio stream error");
            faults(AcquisitionError::StreamFailed(err.to_string()));
        };

        let stream = match sample_format {
            SampleFormat::I16 => {
                let mut mono = Vec::new();
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        downmix(data.iter().map(|&s| s as f32 / 32768.0), channels, &mut mono);
                        sink(&mono);
                    },
                    on_error,
                    None,
                )
            }
            SampleFormat::F32 => {
                let mut mono = Vec::new();
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        downmix(data.iter().copied(), channels, &mut mono);
                        sink(&mono);
                    },
                    on_error,
                    None,
                )
            }
            _ => {
                return Err(AcquisitionError::Unavailable(
                    "Unsupported sample format".into(),
                ))
            }
        }
        .map_err(|e| classify(e.to_string()))?;

        stream.play().map_err(|e| classify(e.to_string()))?;

        if let Ok(name) = device.name() {
            info!(device = %name, sample_rate = config.sample_rate.0, channels, "Input stream opened");
        }
        Ok((stream, config.sample_rate.0))
    }
}

#[async_trait]
impl AudioSource for CpalSource {
    async fn acquire(
        &self,
        source: &SourceHandle,
        sink: FrameSink,
        faults: FaultSink,
    ) -> Result<Box<dyn AudioStream>, AcquisitionError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let handle = source.clone();

        // cpal::Stream is not Send: it lives and dies on this thread
        let thread = std::thread::spawn(move || {
            let stream = match CpalSource::open_stream(&handle, sink, faults) {
                Ok((stream, sample_rate)) => {
                    let _ = ready_tx.send(Ok(sample_rate));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            // Blocks until close() sends or drops the stop sender
            let _ = stop_rx.recv();
            drop(stream);
        });

        let sample_rate = ready_rx
            .await
            .map_err(|_| AcquisitionError::Unavailable("Audio thread exited".into()))??;

        Ok(Box::new(CpalStream {
            sample_rate,
            stop: stop_tx,
            thread: Some(thread),
        }))
    }
}

struct CpalStream {
    sample_rate: u32,
    stop: std_mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl AudioStream for CpalStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn close(mut self: Box<Self>) {
        let _ = self.stop.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Audio thread panicked");
            }
        }
    }
}

/// Average interleaved channels into `out`, reusing its allocation
fn downmix(samples: impl Iterator<Item = f32>, channels: u16, out: &mut Vec<f32>) {
    out.clear();
    let channels = channels.max(1) as usize;
    if channels == 1 {
        out.extend(samples);
        return;
    }

    let mut sum = 0.0;
    let mut n = 0;
    for sample in samples {
        sum += sample;
        n += 1;
        if n == channels {
            out.push(sum / channels as f32);
            sum = 0.0;
            n = 0;
        }
    }
}

/// Map backend error text onto the acquisition taxonomy
fn classify(message: String) -> AcquisitionError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not permitted") {
        AcquisitionError::PermissionDenied(message)
    } else {
        AcquisitionError::Unavailable(message)
    }
}
