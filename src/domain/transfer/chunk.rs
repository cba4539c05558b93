//! Chunks: bounded, positionally addressed fragments of an artifact

use serde::{Deserialize, Serialize};

use super::recording_id::RecordingId;
use crate::domain::recording::{Artifact, AudioMimeType};

/// Default payload bytes per chunk (1 MiB)
pub const DEFAULT_CHUNK_CAP: usize = 1024 * 1024;

/// Default upper bound for one serialized message on the transit channel (2 MiB)
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 2 * 1024 * 1024;

/// Bytes reserved in each message for everything except the encoded payload
/// (tag, recording id, indices, mime type, JSON punctuation)
pub const ENVELOPE_OVERHEAD: usize = 1024;

/// Length of `len` bytes after standard padded base64 encoding
pub const fn base64_len(len: usize) -> usize {
    len.div_ceil(3) * 4
}

/// Largest chunk cap whose encoded message still fits in `max_message_bytes`
pub const fn max_chunk_cap(max_message_bytes: usize) -> usize {
    if max_message_bytes <= ENVELOPE_OVERHEAD {
        return 0;
    }
    (max_message_bytes - ENVELOPE_OVERHEAD) / 4 * 3
}

/// Number of chunks an artifact of `len` bytes splits into
pub const fn chunk_count(len: usize, chunk_cap: usize) -> usize {
    len.div_ceil(chunk_cap)
}

/// One fragment of a recording on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub recording_id: RecordingId,
    #[serde(rename = "chunkIndex")]
    pub index: usize,
    #[serde(rename = "totalChunks")]
    pub total_count: usize,
    #[serde(with = "base64_payload")]
    pub payload: Vec<u8>,
    pub mime_type: AudioMimeType,
}

/// Iterator that splits an owned artifact into chunks in ascending index order.
///
/// The artifact bytes live inside the iterator and are released with it, so
/// only one chunk copy exists alongside the artifact at any time.
#[derive(Debug)]
pub struct Chunker {
    recording_id: RecordingId,
    bytes: Vec<u8>,
    mime_type: AudioMimeType,
    chunk_cap: usize,
    total_count: usize,
    next_index: usize,
}

impl Chunker {
    /// `chunk_cap` must be at least 1
    pub fn new(artifact: Artifact, recording_id: RecordingId, chunk_cap: usize) -> Self {
        let chunk_cap = chunk_cap.max(1);
        let mime_type = artifact.mime_type();
        let bytes = artifact.into_bytes();
        let total_count = chunk_count(bytes.len(), chunk_cap);
        Self {
            recording_id,
            bytes,
            mime_type,
            chunk_cap,
            total_count,
            next_index: 0,
        }
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }
}

impl Iterator for Chunker {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.next_index >= self.total_count {
            return None;
        }
        let start = self.next_index * self.chunk_cap;
        let end = (start + self.chunk_cap).min(self.bytes.len());
        let chunk = Chunk {
            recording_id: self.recording_id.clone(),
            index: self.next_index,
            total_count: self.total_count,
            payload: self.bytes[start..end].to_vec(),
            mime_type: self.mime_type,
        };
        self.next_index += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_count - self.next_index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Chunker {}

/// Serde adapter that carries binary payloads as base64 text
pub mod base64_payload {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(text.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn artifact_of(len: usize) -> Artifact {
        let bytes = (0..len).map(|i| (i % 251) as u8).collect();
        Artifact::new(bytes, AudioMimeType::Wav)
    }

    #[test]
    fn chunk_count_is_ceiling() {
        assert_eq!(chunk_count(1, 1), 1);
        assert_eq!(chunk_count(10, 3), 4);
        assert_eq!(chunk_count(9, 3), 3);
        assert_eq!(chunk_count(5, 100), 1);
    }

    #[test]
    fn chunks_partition_the_artifact() {
        for len in [1usize, 2, 7, 64, 1000] {
            for cap in [1usize, 3, 64, 999, 5000] {
                let artifact = artifact_of(len);
                let original = artifact.bytes().to_vec();
                let chunks: Vec<Chunk> =
                    Chunker::new(artifact, RecordingId::generate(Utc::now()), cap).collect();

                assert_eq!(chunks.len(), chunk_count(len, cap));
                for (i, chunk) in chunks.iter().enumerate() {
                    assert_eq!(chunk.index, i);
                    assert_eq!(chunk.total_count, chunks.len());
                    assert!(!chunk.payload.is_empty());
                    assert!(chunk.payload.len() <= cap);
                }
                let joined: Vec<u8> = chunks.into_iter().flat_map(|c| c.payload).collect();
                assert_eq!(joined, original, "len={} cap={}", len, cap);
            }
        }
    }

    #[test]
    fn two_and_a_half_mib_with_one_mib_cap() {
        let mib = 1024 * 1024;
        let chunker = Chunker::new(
            artifact_of(2 * mib + mib / 2),
            RecordingId::generate(Utc::now()),
            mib,
        );
        assert_eq!(chunker.len(), 3);
        let sizes: Vec<usize> = chunker.map(|c| c.payload.len()).collect();
        assert_eq!(sizes, vec![mib, mib, mib / 2]);
    }

    #[test]
    fn max_chunk_cap_fits_message_limit() {
        let cap = max_chunk_cap(DEFAULT_MAX_MESSAGE_BYTES);
        assert!(cap >= DEFAULT_CHUNK_CAP);
        assert!(base64_len(cap) + ENVELOPE_OVERHEAD <= DEFAULT_MAX_MESSAGE_BYTES);
        assert_eq!(max_chunk_cap(ENVELOPE_OVERHEAD), 0);
    }

    #[test]
    fn serialized_chunk_stays_within_message_limit() {
        let chunk = Chunker::new(
            artifact_of(DEFAULT_CHUNK_CAP),
            RecordingId::generate(Utc::now()),
            DEFAULT_CHUNK_CAP,
        )
        .next()
        .unwrap();

        let wire = serde_json::to_vec(&chunk).unwrap();
        assert!(wire.len() <= base64_len(DEFAULT_CHUNK_CAP) + ENVELOPE_OVERHEAD);
        assert!(wire.len() <= DEFAULT_MAX_MESSAGE_BYTES);
    }

    #[test]
    fn payload_survives_json() {
        let chunk = Chunk {
            recording_id: RecordingId::generate(Utc::now()),
            index: 1,
            total_count: 2,
            payload: vec![0, 255, 7, 128],
            mime_type: AudioMimeType::Flac,
        };
        let json = serde_json::to_string(&chunk).unwrap();
        assert!(json.contains("\"chunkIndex\":1"));
        assert!(json.contains("\"totalChunks\":2"));

        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }
}
