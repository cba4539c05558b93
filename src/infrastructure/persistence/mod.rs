//! Persistence sink adapters

mod filesystem;

pub use filesystem::FilesystemSink;
