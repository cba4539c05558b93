//! Session controller: the single orchestrator of the recording lifecycle

use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::ports::{DownloadHandle, PersistenceError, PersistenceSink, SourceHandle};
use super::protocol::{Ack, CaptureCommand, CaptureEvent, Request, StatusReport};
use super::reassembly::{ChunkOutcome, CompletedRecording, ReassemblyStore};
use crate::domain::error::EmptyRecordingError;
use crate::domain::recording::AudioMimeType;
use crate::domain::session::RecordingSession;
use crate::domain::transfer::{Chunk, RecordingId};

/// Floor for the stale-buffer sweep period
const MIN_SWEEP_PERIOD: StdDuration = StdDuration::from_secs(1);

/// Completion message of a spawned persistence task
#[derive(Debug)]
enum PersistOutcome {
    Saved {
        recording_id: RecordingId,
        handle: DownloadHandle,
    },
    Failed {
        recording_id: RecordingId,
        error: PersistenceError,
    },
}

/// The orchestrator context.
///
/// Owns the session state machine and the reassembly store. Handles each
/// message to completion; persistence runs in spawned tasks whose outcome
/// comes back as a message.
pub struct SessionController<P>
where
    P: PersistenceSink + 'static,
{
    session: RecordingSession,
    store: ReassemblyStore,
    sink: Arc<P>,
    capture: Option<mpsc::Sender<CaptureCommand>>,
    status: watch::Sender<StatusReport>,
    stale_buffer_timeout: StdDuration,
    last_saved: Option<DownloadHandle>,
    saved_count: u64,
    in_flight: usize,
}

impl<P> SessionController<P>
where
    P: PersistenceSink + 'static,
{
    pub fn new(
        sink: P,
        capture: mpsc::Sender<CaptureCommand>,
        status: watch::Sender<StatusReport>,
        stale_buffer_timeout: StdDuration,
    ) -> Self {
        Self {
            session: RecordingSession::new(),
            store: ReassemblyStore::new(),
            sink: Arc::new(sink),
            capture: Some(capture),
            status,
            stale_buffer_timeout,
            last_saved: None,
            saved_count: 0,
            in_flight: 0,
        }
    }

    /// Run until every requester is gone, the capture engine has shut down
    /// and no persistence is in flight.
    pub async fn run(
        mut self,
        mut requests: mpsc::Receiver<Request>,
        mut events: mpsc::Receiver<CaptureEvent>,
    ) {
        let (persist_tx, mut persist_rx) = mpsc::channel::<PersistOutcome>(16);
        let mut sweep = interval((self.stale_buffer_timeout / 2).max(MIN_SWEEP_PERIOD));
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut requests_open = true;
        let mut events_open = true;

        while requests_open || events_open || self.in_flight > 0 {
            tokio::select! {
                request = requests.recv(), if requests_open => match request {
                    Some(request) => self.handle_request(request).await,
                    None => {
                        debug!("All requesters gone, shutting down capture");
                        requests_open = false;
                        // Dropping the command sender makes the engine finalize and exit
                        self.capture = None;
                    }
                },
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event, &persist_tx),
                    None => events_open = false,
                },
                Some(outcome) = persist_rx.recv() => self.handle_persisted(outcome),
                _ = sweep.tick() => self.sweep(),
            }
            self.publish();
        }
        debug!("Session controller stopped");
    }

    fn report(&self) -> StatusReport {
        StatusReport {
            is_recording: self.session.is_recording(),
            state: self.session.state(),
            session: self.session.current_id(),
            started_at: self.session.started_at(),
            last_error: self.session.last_error().map(str::to_string),
            last_saved: self.last_saved.clone(),
            saved_count: self.saved_count,
            pending_transfers: self.store.pending() + self.in_flight,
        }
    }

    fn publish(&self) {
        let report = self.report();
        self.status.send_if_modified(|current| {
            if *current == report {
                return false;
            }
            *current = report;
            true
        });
    }

    async fn handle_request(&mut self, request: Request) {
        match request {
            Request::StartRecording { source, ack } => {
                let outcome = self.start(source).await;
                self.reply(ack, outcome);
            }
            Request::StopRecording { ack } => {
                let outcome = self.stop().await;
                self.reply(ack, outcome);
            }
            Request::GetStatus { reply } => {
                let _ = reply.send(self.report());
            }
            Request::ClearError { ack } => {
                let outcome = if self.session.last_error().is_some() {
                    self.session.clear_error();
                    Ack::Accepted
                } else {
                    Ack::Ignored
                };
                self.reply(ack, outcome);
            }
        }
    }

    /// Publish before answering so a requester that waits on the status
    /// channel after the ack never sees the previous state
    fn reply(&self, ack: oneshot::Sender<Ack>, outcome: Ack) {
        self.publish();
        let _ = ack.send(outcome);
    }

    async fn start(&mut self, source: SourceHandle) -> Ack {
        let Some(capture) = self.capture.clone() else {
            return Ack::Ignored;
        };
        let Some(session) = self.session.request_start() else {
            debug!(state = %self.session.state(), "Start ignored");
            return Ack::Ignored;
        };

        info!(session = %session, source = %source, "Starting recording");
        if capture
            .send(CaptureCommand::Start { session, source })
            .await
            .is_err()
        {
            self.session.set_error("Capture engine is not running");
            let _ = self.session.finish(session);
            return Ack::Ignored;
        }
        Ack::Accepted
    }

    async fn stop(&mut self) -> Ack {
        let Some(capture) = self.capture.clone() else {
            return Ack::Ignored;
        };
        let Some(session) = self.session.request_stop() else {
            debug!(state = %self.session.state(), "Stop ignored");
            return Ack::Ignored;
        };

        info!(session = %session, "Stopping recording");
        if capture.send(CaptureCommand::Stop { session }).await.is_err() {
            self.session.set_error("Capture engine is not running");
            let _ = self.session.finish(session);
        }
        Ack::Accepted
    }

    fn handle_event(&mut self, event: CaptureEvent, persist_tx: &mpsc::Sender<PersistOutcome>) {
        match event {
            CaptureEvent::Started {
                session,
                started_at,
            } => match self.session.mark_active(session, started_at) {
                Ok(()) => info!(session = %session, "Recording active"),
                Err(e) => debug!(error = %e, "Ignoring stale Started event"),
            },
            CaptureEvent::SaveRecordingChunk(chunk) => self.accept_chunk(chunk, persist_tx),
            CaptureEvent::SaveRecording { payload, mime_type } => {
                self.accept_single(payload, mime_type, persist_tx)
            }
            CaptureEvent::Error { message } => {
                warn!(error = %message, "Capture error");
                self.session.set_error(message);
            }
            CaptureEvent::Stopped { session } => match self.session.finish(session) {
                Ok(()) => info!(session = %session, "Recording idle"),
                Err(e) => debug!(error = %e, "Ignoring stale Stopped event"),
            },
        }
    }

    fn accept_chunk(&mut self, chunk: Chunk, persist_tx: &mpsc::Sender<PersistOutcome>) {
        match self.store.on_chunk(chunk, Instant::now()) {
            Ok(ChunkOutcome::Pending { .. }) => {}
            Ok(ChunkOutcome::Complete(recording)) => self.persist(recording, persist_tx),
            Err(e) => {
                warn!(error = %e, "Rejected chunk");
                self.session.set_error(e.to_string());
            }
        }
    }

    /// Route a single-message recording through the chunk path as chunk 0 of 1
    fn accept_single(
        &mut self,
        payload: Vec<u8>,
        mime_type: AudioMimeType,
        persist_tx: &mpsc::Sender<PersistOutcome>,
    ) {
        if payload.is_empty() {
            self.session.set_error(EmptyRecordingError.to_string());
            return;
        }
        let started_at = self.session.started_at().unwrap_or_else(chrono::Utc::now);
        let chunk = Chunk {
            recording_id: RecordingId::generate(started_at),
            index: 0,
            total_count: 1,
            payload,
            mime_type,
        };
        self.accept_chunk(chunk, persist_tx);
    }

    fn persist(&mut self, recording: CompletedRecording, persist_tx: &mpsc::Sender<PersistOutcome>) {
        self.in_flight += 1;
        let sink = Arc::clone(&self.sink);
        let persist_tx = persist_tx.clone();

        tokio::spawn(async move {
            let filename = recording.suggested_filename();
            let CompletedRecording {
                recording_id,
                bytes,
                ..
            } = recording;
            debug!(recording = %recording_id, filename = %filename, size = bytes.len(), "Persisting recording");

            let outcome = match sink.save(bytes, &filename).await {
                Ok(handle) => PersistOutcome::Saved {
                    recording_id,
                    handle,
                },
                Err(error) => PersistOutcome::Failed {
                    recording_id,
                    error,
                },
            };
            let _ = persist_tx.send(outcome).await;
        });
    }

    fn handle_persisted(&mut self, outcome: PersistOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match outcome {
            PersistOutcome::Saved {
                recording_id,
                handle,
            } => {
                info!(recording = %recording_id, location = %handle, "Recording saved");
                self.saved_count += 1;
                self.last_saved = Some(handle);
            }
            PersistOutcome::Failed {
                recording_id,
                error,
            } => {
                warn!(recording = %recording_id, error = %error, "Failed to save recording");
                self.session.set_error(error.to_string());
            }
        }
    }

    fn sweep(&mut self) {
        for error in self.store.evict_stale(Instant::now(), self.stale_buffer_timeout) {
            warn!(error = %error, "Reclaimed stale reassembly buffer");
            self.session.set_error(error.to_string());
        }
    }
}
