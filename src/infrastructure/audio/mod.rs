//! Audio source adapters
//!
//! `synthetic[:hz]` handles go to the tone generator, everything else to the
//! host input devices via cpal.

mod cpal_source;
mod synthetic;

pub use cpal_source::{CpalSource, DEFAULT_DEVICE};
pub use synthetic::{SyntheticSource, SYNTHETIC_PREFIX};

use async_trait::async_trait;

use crate::application::ports::{
    AcquisitionError, AudioSource, AudioStream, FaultSink, FrameSink, SourceHandle,
};

/// Source that routes each handle to the adapter that understands it
#[derive(Debug, Default)]
pub struct HostAudioSource {
    cpal: CpalSource,
    synthetic: SyntheticSource,
}

impl HostAudioSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AudioSource for HostAudioSource {
    async fn acquire(
        &self,
        source: &SourceHandle,
        sink: FrameSink,
        faults: FaultSink,
    ) -> Result<Box<dyn AudioStream>, AcquisitionError> {
        if SyntheticSource::handles(source) {
            self.synthetic.acquire(source, sink, faults).await
        } else {
            self.cpal.acquire(source, sink, faults).await
        }
    }
}
