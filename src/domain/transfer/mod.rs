//! Transfer domain module
//!
//! Chunks and recording ids exchanged between the capture and orchestrator
//! contexts.

mod chunk;
mod recording_id;

pub use chunk::{
    base64_len, base64_payload, chunk_count, max_chunk_cap, Chunk, Chunker, DEFAULT_CHUNK_CAP,
    DEFAULT_MAX_MESSAGE_BYTES, ENVELOPE_OVERHEAD,
};
pub use recording_id::RecordingId;
