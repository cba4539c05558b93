//! Recording domain module

mod artifact;
mod duration;
pub mod segment;

pub use artifact::{
    filename_timestamp, human_readable_size, recording_filename, Artifact, AudioMimeType,
};
pub use duration::Duration;
pub use segment::{concat_segments, EncodedSegment, SegmentBuffer, SegmentEncoder};
