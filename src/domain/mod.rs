//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and domain errors.
//! This layer has no dependencies on external systems.

pub mod config;
pub mod error;
pub mod recording;
pub mod session;
pub mod transfer;

// Re-export common types
pub use config::{AppConfig, RecorderConfig};
pub use error::*;
pub use recording::{Artifact, AudioMimeType, Duration};
pub use session::{RecordingSession, SessionId, SessionState};
pub use transfer::{Chunk, RecordingId};
