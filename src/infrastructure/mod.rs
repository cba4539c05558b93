//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with external systems like the host audio stack,
//! container encoders and the filesystem.

pub mod audio;
pub mod config;
pub mod encoding;
pub mod persistence;

// Re-export adapters
pub use audio::{CpalSource, HostAudioSource, SyntheticSource};
pub use config::XdgConfigStore;
pub use encoding::{create_encoder, FlacEncoder, ResamplingEncoder, WavEncoder};
pub use persistence::FilesystemSink;
