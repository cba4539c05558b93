//! Recorder wiring: spawns the capture and orchestrator contexts and hands
//! out requester handles

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use super::capture::{CaptureEngine, CaptureSettings};
use super::controller::SessionController;
use super::ports::{AudioSource, ContainerEncoder, PersistenceSink, SourceHandle};
use super::protocol::{Ack, Request, StatusReport};
use super::transfer::TransferProtocol;
use crate::domain::config::RecorderConfig;

/// Request queue depth between requesters and the controller
const REQUEST_CAPACITY: usize = 32;

/// Command queue depth; the controller sends at most two per session
const COMMAND_CAPACITY: usize = 8;

/// Event queue depth; bounds how many chunks wait on the orchestrator
const EVENT_CAPACITY: usize = 16;

/// Requester-side errors
#[derive(Debug, Clone, Error)]
pub enum RecorderError {
    #[error("Recorder is not running")]
    Closed,
}

/// Cloneable requester handle
#[derive(Debug, Clone)]
pub struct RecorderHandle {
    requests: mpsc::Sender<Request>,
    status: watch::Receiver<StatusReport>,
}

impl RecorderHandle {
    /// Ask to start recording from `source`
    pub async fn start(&self, source: SourceHandle) -> Result<Ack, RecorderError> {
        self.ask(|ack| Request::StartRecording { source, ack }).await
    }

    /// Ask the active session to stop; a no-op otherwise
    pub async fn stop(&self) -> Result<Ack, RecorderError> {
        self.ask(|ack| Request::StopRecording { ack }).await
    }

    pub async fn status(&self) -> Result<StatusReport, RecorderError> {
        self.ask(|reply| Request::GetStatus { reply }).await
    }

    pub async fn clear_error(&self) -> Result<Ack, RecorderError> {
        self.ask(|ack| Request::ClearError { ack }).await
    }

    /// Receiver that observes every published status change
    pub fn subscribe(&self) -> watch::Receiver<StatusReport> {
        self.status.clone()
    }

    async fn ask<T>(
        &self,
        request: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, RecorderError> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(request(tx))
            .await
            .map_err(|_| RecorderError::Closed)?;
        rx.await.map_err(|_| RecorderError::Closed)
    }
}

/// Both recorder contexts, running as tokio tasks
pub struct Recorder {
    handle: RecorderHandle,
    controller: JoinHandle<()>,
    engine: JoinHandle<()>,
}

impl Recorder {
    /// Spawn the capture engine and session controller, connected by one
    /// bounded channel per direction
    pub fn spawn<S, E, P>(source: S, encoder: E, sink: P, config: &RecorderConfig) -> Self
    where
        S: AudioSource + 'static,
        E: ContainerEncoder + 'static,
        P: PersistenceSink + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);
        let (status_tx, status_rx) = watch::channel(StatusReport::default());

        let engine = CaptureEngine::new(
            source,
            encoder,
            TransferProtocol::from_config(config),
            CaptureSettings::from(config),
            event_tx,
        );
        let controller = SessionController::new(
            sink,
            command_tx,
            status_tx,
            config.stale_buffer_timeout.as_std(),
        );

        Self {
            handle: RecorderHandle {
                requests: request_tx,
                status: status_rx,
            },
            engine: tokio::spawn(engine.run(command_rx)),
            controller: tokio::spawn(controller.run(request_rx, event_rx)),
        }
    }

    pub fn handle(&self) -> RecorderHandle {
        self.handle.clone()
    }

    /// Drop this handle and wait for both contexts to finish.
    ///
    /// Completes once every other [`RecorderHandle`] clone is gone too; an
    /// active session is finalized and persisted first.
    pub async fn shutdown(self) {
        let Self {
            handle,
            controller,
            engine,
        } = self;
        drop(handle);

        if let Err(e) = engine.await {
            warn!(error = %e, "Capture engine task failed");
        }
        if let Err(e) = controller.await {
            warn!(error = %e, "Session controller task failed");
        }
    }
}
