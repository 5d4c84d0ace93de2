//! Speech-to-text: backend contracts and the serialized recognition queue.

pub mod queue;
pub mod streaming;
pub mod transcriber;
pub mod whisper;

pub use queue::{RecognitionHandle, RecognitionQueue};
pub use streaming::{BackendStream, ChunkedTranscriber, StreamingBackend};
pub use transcriber::{MockTranscriber, Transcriber};
