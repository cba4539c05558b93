//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod audio_source;
pub mod config;
pub mod encoder;
pub mod persistence;

// Re-export common types
pub use audio_source::{
    AcquisitionError, AudioSource, AudioStream, FaultSink, FrameSink, SourceHandle,
};
pub use config::ConfigStore;
pub use encoder::{ContainerEncoder, EncodeError};
pub use persistence::{DownloadHandle, PersistenceError, PersistenceSink};
