//! Streaming recognition backends.
//!
//! Some backends only accept audio incrementally and emit their final text
//! after a drain. `ChunkedTranscriber` adapts that shape to the
//! whole-segment [`Transcriber`] contract, so the recognition queue sees a
//! single interface regardless of backend shape.

use crate::error::Result;
use crate::stt::transcriber::Transcriber;

/// Backend that accepts samples incrementally.
pub trait StreamingBackend: Send + Sync {
    /// Streaming transcription state for this backend.
    type Stream<'a>: BackendStream + 'a
    where
        Self: 'a;

    /// Create a streaming transcriber that accepts samples incrementally.
    fn create_stream(&self) -> Result<Self::Stream<'_>>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;
}

/// Streaming transcription interface returned by
/// [`StreamingBackend::create_stream`].
pub trait BackendStream {
    /// Consume a new chunk of mono 16kHz samples.
    fn accept_chunk(&mut self, samples: &[i16]) -> Result<()>;

    /// Drain to terminal state and return the final text.
    ///
    /// Backends that stream intermediate updates must not return until the
    /// terminal result is available.
    fn finalize(&mut self) -> Result<String>;
}

/// Adapter running a whole segment through a streaming backend.
pub struct ChunkedTranscriber<B: StreamingBackend> {
    backend: B,
    chunk_samples: usize,
}

impl<B: StreamingBackend> ChunkedTranscriber<B> {
    /// Wraps a streaming backend, feeding it `chunk_samples`-sized chunks.
    pub fn new(backend: B, chunk_samples: usize) -> Self {
        Self {
            backend,
            chunk_samples: chunk_samples.max(1),
        }
    }
}

impl<B: StreamingBackend> Transcriber for ChunkedTranscriber<B> {
    fn transcribe(&self, audio: &[i16]) -> Result<String> {
        let mut stream = self.backend.create_stream()?;
        for chunk in audio.chunks(self.chunk_samples) {
            stream.accept_chunk(chunk)?;
        }
        stream.finalize()
    }

    fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    fn is_ready(&self) -> bool {
        true
    }
}
