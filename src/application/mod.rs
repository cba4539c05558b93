//! Application layer - Use cases and port interfaces
//!
//! Contains the two recorder contexts (capture and orchestration), the
//! messages they exchange, and the trait definitions for external systems.

pub mod capture;
pub mod controller;
pub mod ports;
pub mod protocol;
pub mod reassembly;
pub mod service;
pub mod transfer;

// Re-export use cases
pub use capture::{CaptureEngine, CaptureError, CaptureSettings};
pub use controller::SessionController;
pub use protocol::{Ack, CaptureCommand, CaptureEvent, Request, StatusReport};
pub use reassembly::{ChunkOutcome, CompletedRecording, ReassemblyError, ReassemblyStore};
pub use service::{Recorder, RecorderError, RecorderHandle};
pub use transfer::{TransferError, TransferProtocol};
