//! Session domain module

mod session;

pub use session::{InvalidStateTransition, RecordingSession, SessionId, SessionState};
