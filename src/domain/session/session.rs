//! Recording session state machine

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of one Start-to-Stop lifecycle, allocated by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Starting,
    Active,
    Stopping,
}

impl SessionState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Active => "active",
            Self::Stopping => "stopping",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an event does not fit the current state
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: SessionState,
    pub action: String,
}

/// The single recording session owned by the session controller.
///
/// State machine:
///   IDLE -> STARTING (request_start)
///   STARTING -> ACTIVE (mark_active)
///   ACTIVE -> STOPPING (request_stop)
///   STARTING | ACTIVE | STOPPING -> IDLE (finish)
///
/// The last error is an orthogonal flag: it can be set in any state and
/// survives until `clear_error`. It never blocks a new start.
#[derive(Debug, Default)]
pub struct RecordingSession {
    state: SessionState,
    current: Option<SessionId>,
    started_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    next_id: u64,
}

impl RecordingSession {
    /// Create a new session in idle state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    /// True while a source is being acquired or captured
    pub fn is_recording(&self) -> bool {
        matches!(self.state, SessionState::Starting | SessionState::Active)
    }

    /// Id of the session that is not yet back to idle
    pub fn current_id(&self) -> Option<SessionId> {
        self.current
    }

    /// Start time of the most recent session that became active
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Begin a new session. Returns `None` (no-op) unless idle.
    pub fn request_start(&mut self) -> Option<SessionId> {
        if !self.is_idle() {
            return None;
        }
        self.next_id += 1;
        let id = SessionId::new(self.next_id);
        self.current = Some(id);
        self.state = SessionState::Starting;
        Some(id)
    }

    /// The capture engine acquired the source for `id`
    pub fn mark_active(
        &mut self,
        id: SessionId,
        started_at: DateTime<Utc>,
    ) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::Starting || self.current != Some(id) {
            return Err(self.invalid(format!("activate {}", id)));
        }
        self.state = SessionState::Active;
        self.started_at = Some(started_at);
        Ok(())
    }

    /// Ask the active session to stop. Returns `None` (no-op) unless active,
    /// so repeated stops are harmless.
    pub fn request_stop(&mut self) -> Option<SessionId> {
        if self.state != SessionState::Active {
            return None;
        }
        self.state = SessionState::Stopping;
        self.current
    }

    /// The capture engine tore down session `id`
    pub fn finish(&mut self, id: SessionId) -> Result<(), InvalidStateTransition> {
        if self.is_idle() || self.current != Some(id) {
            return Err(self.invalid(format!("finish {}", id)));
        }
        self.state = SessionState::Idle;
        self.current = None;
        Ok(())
    }

    /// Record the latest human-readable error
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    /// Clear the error flag without touching the state
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn invalid(&self, action: String) -> InvalidStateTransition {
        InvalidStateTransition {
            current_state: self.state,
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_session() -> (RecordingSession, SessionId) {
        let mut session = RecordingSession::new();
        let id = session.request_start().unwrap();
        session.mark_active(id, Utc::now()).unwrap();
        (session, id)
    }

    #[test]
    fn new_session_is_idle() {
        let session = RecordingSession::new();
        assert!(session.is_idle());
        assert!(!session.is_recording());
        assert!(session.current_id().is_none());
        assert!(session.last_error().is_none());
    }

    #[test]
    fn full_cycle() {
        let (mut session, id) = active_session();
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.is_recording());

        assert_eq!(session.request_stop(), Some(id));
        assert_eq!(session.state(), SessionState::Stopping);
        assert!(!session.is_recording());

        session.finish(id).unwrap();
        assert!(session.is_idle());

        // Can start another cycle with a fresh id
        let next = session.request_start().unwrap();
        assert_ne!(next, id);
    }

    #[test]
    fn start_is_noop_while_busy() {
        let mut session = RecordingSession::new();
        let id = session.request_start().unwrap();
        assert!(session.request_start().is_none());

        session.mark_active(id, Utc::now()).unwrap();
        assert!(session.request_start().is_none());

        session.request_stop();
        assert!(session.request_start().is_none());
        assert_eq!(session.current_id(), Some(id));
    }

    #[test]
    fn stop_is_noop_unless_active() {
        let mut session = RecordingSession::new();
        assert!(session.request_stop().is_none());
        assert!(session.is_idle());

        let id = session.request_start().unwrap();
        assert!(session.request_stop().is_none());
        assert_eq!(session.state(), SessionState::Starting);

        session.mark_active(id, Utc::now()).unwrap();
        assert_eq!(session.request_stop(), Some(id));
        assert!(session.request_stop().is_none());
        assert!(session.request_stop().is_none());
        assert_eq!(session.state(), SessionState::Stopping);
    }

    #[test]
    fn failed_start_returns_to_idle() {
        let mut session = RecordingSession::new();
        let id = session.request_start().unwrap();
        session.set_error("Audio source not found: tab-7");
        session.finish(id).unwrap();

        assert!(session.is_idle());
        assert_eq!(session.last_error(), Some("Audio source not found: tab-7"));
        assert!(session.started_at().is_none());
    }

    #[test]
    fn stale_events_are_rejected() {
        let (mut session, id) = active_session();
        let stale = SessionId::new(id.value() + 10);

        let err = session.finish(stale).unwrap_err();
        assert_eq!(err.current_state, SessionState::Active);
        assert!(err.action.contains("finish"));

        let err = session.mark_active(id, Utc::now()).unwrap_err();
        assert_eq!(err.current_state, SessionState::Active);
    }

    #[test]
    fn error_is_orthogonal_to_state() {
        let (mut session, _) = active_session();
        session.set_error("disk full");
        assert_eq!(session.state(), SessionState::Active);

        session.clear_error();
        assert!(session.last_error().is_none());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn error_does_not_block_new_start() {
        let mut session = RecordingSession::new();
        session.set_error("previous failure");
        assert!(session.request_start().is_some());
        assert_eq!(session.last_error(), Some("previous failure"));
    }

    #[test]
    fn at_most_one_session_for_any_command_sequence() {
        let mut session = RecordingSession::new();
        let mut live: Option<SessionId> = None;
        let mut seed: u32 = 0x2545_f491;

        for _ in 0..2000 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            match (seed >> 16) % 5 {
                0 => {
                    if let Some(id) = session.request_start() {
                        assert!(live.is_none(), "second session started while {:?} live", live);
                        live = Some(id);
                    }
                }
                1 => {
                    if let Some(id) = live {
                        let _ = session.mark_active(id, Utc::now());
                    }
                }
                2 => {
                    let _ = session.request_stop();
                }
                3 => {
                    if let Some(id) = live {
                        if session.finish(id).is_ok() {
                            live = None;
                        }
                    }
                }
                _ => session.set_error("synthetic failure"),
            }
            assert_eq!(session.current_id(), live);
        }
    }

    #[test]
    fn state_display() {
        assert_eq!(SessionState::Idle.to_string(), "idle");
        assert_eq!(SessionState::Starting.to_string(), "starting");
        assert_eq!(SessionState::Active.to_string(), "active");
        assert_eq!(SessionState::Stopping.to_string(), "stopping");
        assert_eq!(SessionId::new(3).to_string(), "session-3");
    }
}
