//! Capture engine: owns the audio source and the real-time encode loop for
//! the active session, and hands finished artifacts to the transfer protocol

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::ports::{
    AcquisitionError, AudioSource, AudioStream, ContainerEncoder, EncodeError, FaultSink, FrameSink,
    SourceHandle,
};
use super::protocol::{CaptureCommand, CaptureEvent};
use super::transfer::{TransferError, TransferProtocol};
use crate::domain::config::RecorderConfig;
use crate::domain::error::EmptyRecordingError;
use crate::domain::recording::segment::pcm_from_le_bytes;
use crate::domain::recording::{
    concat_segments, human_readable_size, Artifact, Duration, EncodedSegment, SegmentBuffer,
    SegmentEncoder,
};
use crate::domain::session::SessionId;
use crate::domain::transfer::RecordingId;

/// Errors while finalizing a session
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Empty(#[from] EmptyRecordingError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("Encoder task failed: {0}")]
    Task(String),
}

/// Capture settings taken from [`RecorderConfig`]
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub max_duration: Duration,
    pub block_samples: usize,
    pub segment_memory_limit: usize,
}

impl From<&RecorderConfig> for CaptureSettings {
    fn from(config: &RecorderConfig) -> Self {
        Self {
            max_duration: config.max_duration,
            block_samples: config.block_samples,
            segment_memory_limit: config.segment_memory_limit,
        }
    }
}

/// Encoder state shared with the frame callback
struct EncodePipeline {
    encoder: SegmentEncoder,
    buffer: SegmentBuffer,
    sealed: bool,
}

/// What remains of a pipeline once sealed
struct SealedAudio {
    segments: VecDeque<EncodedSegment>,
    evicted_segments: u64,
    evicted_bytes: u64,
}

impl EncodePipeline {
    fn new(settings: &CaptureSettings) -> Self {
        Self {
            encoder: SegmentEncoder::new(settings.block_samples),
            buffer: SegmentBuffer::new(settings.segment_memory_limit),
            sealed: false,
        }
    }

    fn push_frame(&mut self, frame: &[f32]) {
        if self.sealed {
            return;
        }
        let Self { encoder, buffer, .. } = self;
        encoder.encode_frame(frame, |segment| buffer.push(segment));
    }

    /// Refuse further frames and flush the partial block
    fn seal(&mut self) -> SealedAudio {
        self.sealed = true;
        if let Some(segment) = self.encoder.flush() {
            self.buffer.push(segment);
        }
        SealedAudio {
            segments: self.buffer.take_segments(),
            evicted_segments: self.buffer.evicted_segments(),
            evicted_bytes: self.buffer.evicted_bytes(),
        }
    }
}

/// A running stream failed; tagged so late reports from an old session are dropped
#[derive(Debug)]
struct StreamFault {
    session: SessionId,
    error: AcquisitionError,
}

struct ActiveCapture {
    session: SessionId,
    started_at: DateTime<Utc>,
    deadline: Instant,
    stream: Box<dyn AudioStream>,
    pipeline: Arc<StdMutex<EncodePipeline>>,
}

/// The capture context.
///
/// Runs as its own task, driven by [`CaptureCommand`]s, and reports back
/// only through [`CaptureEvent`]s.
pub struct CaptureEngine<S, E>
where
    S: AudioSource,
    E: ContainerEncoder + 'static,
{
    source: S,
    encoder: Arc<E>,
    transfer: TransferProtocol,
    settings: CaptureSettings,
    events: mpsc::Sender<CaptureEvent>,
    active: Option<ActiveCapture>,
}

impl<S, E> CaptureEngine<S, E>
where
    S: AudioSource,
    E: ContainerEncoder + 'static,
{
    pub fn new(
        source: S,
        encoder: E,
        transfer: TransferProtocol,
        settings: CaptureSettings,
        events: mpsc::Sender<CaptureEvent>,
    ) -> Self {
        Self {
            source,
            encoder: Arc::new(encoder),
            transfer,
            settings,
            events,
            active: None,
        }
    }

    /// Process commands until the command channel closes.
    /// An active session is finalized before returning.
    pub async fn run(mut self, mut commands: mpsc::Receiver<CaptureCommand>) {
        let (fault_tx, mut faults) = mpsc::unbounded_channel();

        loop {
            let deadline = self.active.as_ref().map(|active| active.deadline);

            tokio::select! {
                command = commands.recv() => match command {
                    Some(CaptureCommand::Start { session, source }) => {
                        self.start(session, source, &fault_tx).await
                    }
                    Some(CaptureCommand::Stop { session }) => self.stop(session).await,
                    None => break,
                },
                Some(fault) = faults.recv() => self.on_fault(fault).await,
                _ = wait_for_deadline(deadline) => {
                    if let Some(active) = self.active.take() {
                        info!(session = %active.session, max = %self.settings.max_duration, "Maximum duration reached");
                        self.finalize(active, None).await;
                    }
                }
            }
        }

        if let Some(active) = self.active.take() {
            info!(session = %active.session, "Command channel closed, finalizing");
            self.finalize(active, None).await;
        }
        debug!("Capture engine stopped");
    }

    async fn start(
        &mut self,
        session: SessionId,
        source: SourceHandle,
        fault_tx: &mpsc::UnboundedSender<StreamFault>,
    ) {
        if let Some(active) = &self.active {
            warn!(session = %session, active = %active.session, "Start ignored, already capturing");
            return;
        }

        let pipeline = Arc::new(StdMutex::new(EncodePipeline::new(&self.settings)));
        let frames = Arc::clone(&pipeline);
        let sink: FrameSink = Box::new(move |frame: &[f32]| {
            if let Ok(mut pipeline) = frames.lock() {
                pipeline.push_frame(frame);
            }
        });

        let fault_tx = fault_tx.clone();
        let faults: FaultSink = Box::new(move |error| {
            let _ = fault_tx.send(StreamFault { session, error });
        });

        match self.source.acquire(&source, sink, faults).await {
            Ok(stream) => {
                let started_at = Utc::now();
                info!(session = %session, source = %source, sample_rate = stream.sample_rate(), "Capture started");
                self.active = Some(ActiveCapture {
                    session,
                    started_at,
                    deadline: Instant::now() + self.settings.max_duration.as_std(),
                    stream,
                    pipeline,
                });
                self.emit(CaptureEvent::Started {
                    session,
                    started_at,
                })
                .await;
            }
            Err(e) => {
                warn!(session = %session, source = %source, error = %e, "Failed to acquire audio source");
                self.emit(CaptureEvent::Error {
                    message: e.to_string(),
                })
                .await;
                self.emit(CaptureEvent::Stopped { session }).await;
            }
        }
    }

    async fn stop(&mut self, session: SessionId) {
        match self.active.take() {
            Some(active) if active.session == session => self.finalize(active, None).await,
            Some(active) => {
                debug!(session = %session, active = %active.session, "Stop for another session ignored");
                self.active = Some(active);
            }
            None => debug!(session = %session, "Stop ignored, not capturing"),
        }
    }

    /// The source failed mid-session: keep what was captured and end the session
    async fn on_fault(&mut self, fault: StreamFault) {
        match self.active.take() {
            Some(active) if active.session == fault.session => {
                warn!(session = %fault.session, error = %fault.error, "Audio source failed, finalizing");
                self.finalize(active, Some(fault.error)).await;
            }
            active => {
                debug!(session = %fault.session, error = %fault.error, "Fault for inactive session ignored");
                self.active = active;
            }
        }
    }

    /// Tear down `active` and ship its artifact. Always ends with `Stopped`;
    /// `fault` is reported last so it becomes the session's error.
    async fn finalize(&mut self, active: ActiveCapture, fault: Option<AcquisitionError>) {
        let ActiveCapture {
            session,
            started_at,
            stream,
            pipeline,
            ..
        } = active;

        let sample_rate = stream.sample_rate();
        let sealed = pipeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .seal();

        // Release the source before the (slow) packaging step
        if let Err(e) = tokio::task::spawn_blocking(move || stream.close()).await {
            warn!(session = %session, error = %e, "Audio stream close task failed");
        }
        drop(pipeline);

        if sealed.evicted_segments > 0 {
            warn!(
                session = %session,
                segments = sealed.evicted_segments,
                bytes = sealed.evicted_bytes,
                "Memory limit reached, oldest audio was dropped"
            );
        }

        if let Err(e) = self.deliver(session, started_at, sealed.segments, sample_rate).await {
            warn!(session = %session, error = %e, "Recording not delivered");
            self.emit(CaptureEvent::Error {
                message: e.to_string(),
            })
            .await;
        }

        if let Some(error) = fault {
            self.emit(CaptureEvent::Error {
                message: error.to_string(),
            })
            .await;
        }

        info!(session = %session, "Capture stopped");
        self.emit(CaptureEvent::Stopped { session }).await;
    }

    async fn deliver(
        &self,
        session: SessionId,
        started_at: DateTime<Utc>,
        segments: VecDeque<EncodedSegment>,
        sample_rate: u32,
    ) -> Result<(), CaptureError> {
        let artifact = self.package(segments, sample_rate).await?;
        info!(
            session = %session,
            size = %human_readable_size(artifact.len()),
            mime = %artifact.mime_type(),
            "Recording encoded"
        );

        let recording_id = RecordingId::generate(started_at);
        self.transfer.send(artifact, recording_id, &self.events).await?;
        Ok(())
    }

    /// Package the buffered segments in the container format, off the executor
    async fn package(
        &self,
        segments: VecDeque<EncodedSegment>,
        sample_rate: u32,
    ) -> Result<Artifact, CaptureError> {
        if segments.iter().all(EncodedSegment::is_empty) {
            return Err(EmptyRecordingError.into());
        }

        let encoder = Arc::clone(&self.encoder);
        let bytes = tokio::task::spawn_blocking(move || {
            let samples = pcm_from_le_bytes(&concat_segments(segments));
            encoder.package(&samples, sample_rate)
        })
        .await
        .map_err(|e| CaptureError::Task(e.to_string()))??;

        if bytes.is_empty() {
            return Err(EmptyRecordingError.into());
        }
        Ok(Artifact::new(bytes, self.encoder.mime_type()))
    }

    async fn emit(&self, event: CaptureEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Event channel closed");
        }
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
