//! Recording identifiers

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Process-wide sequence shared by every generated id
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Hex digits of random nonce kept per id (64 bits)
const NONCE_LEN: usize = 16;

/// Identifies one transferred recording across the context boundary.
///
/// Combines the session start time, a monotonically increasing counter and a
/// random nonce, so two ids never collide even across concurrent senders or
/// restarts within the same millisecond.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingId {
    started_at: DateTime<Utc>,
    sequence: u64,
    nonce: String,
}

impl RecordingId {
    /// Generate a fresh id for a session that started at `started_at`
    pub fn generate(started_at: DateTime<Utc>) -> Self {
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed) + 1;
        let mut nonce = Uuid::new_v4().simple().to_string();
        nonce.truncate(NONCE_LEN);
        Self {
            started_at,
            sequence,
            nonce,
        }
    }

    /// When the recorded session started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rec-{}-{}-{}",
            self.started_at.timestamp_millis(),
            self.sequence,
            self.nonce
        )
    }
}
