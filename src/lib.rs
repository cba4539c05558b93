//! TapeRelay - live audio capture with chunked hand-off to durable storage
//!
//! A capture context records audio and encodes it in real time; when a
//! session stops, the finished recording is split into size-bounded chunks
//! and sent across a message boundary to an orchestrator context, which
//! reassembles it and hands it to a persistence sink.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Value objects, the session state machine, chunk framing, and errors
//! - **Application**: The capture engine, session controller, transfer and
//!   reassembly use cases, and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal, WAV/FLAC encoders, filesystem, config)
//! - **CLI**: Command-line interface, daemon control socket, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
