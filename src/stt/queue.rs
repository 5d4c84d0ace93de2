//! Serialized recognition queue.
//!
//! The loaded recognition model holds mutable, non-reentrant native state,
//! so every transcription call in the process goes through one first-in
//! first-out queue drained by a single worker loop. The serialization
//! invariant is structural: there is exactly one consumer, so no two calls
//! can ever execute concurrently, no matter how many enhanced segments are
//! ready at once.

use crate::stt::transcriber::Transcriber;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

struct Job {
    samples: Vec<i16>,
    reply: oneshot::Sender<String>,
}

/// Handle for submitting transcription jobs. Cheap to clone; the worker
/// exits when every handle is dropped.
#[derive(Clone)]
pub struct RecognitionHandle {
    tx: mpsc::Sender<Job>,
}

impl RecognitionHandle {
    /// Queues a segment and waits for its text.
    ///
    /// Never returns an error: backend failures, worker panics and queue
    /// shutdown all surface as empty text. Recognition failure is a
    /// per-segment condition, not a session-fatal one.
    pub async fn transcribe(&self, samples: Vec<i16>) -> String {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = Job {
            samples,
            reply: reply_tx,
        };

        if self.tx.send(job).await.is_err() {
            warn!("recognition queue is gone, returning empty transcript");
            return String::new();
        }

        reply_rx.await.unwrap_or_default()
    }
}

/// The queue's worker side. `start` spawns the single drain loop.
pub struct RecognitionQueue;

impl RecognitionQueue {
    /// Spawns the worker loop owning the recognition resource and returns
    /// the submission handle.
    pub fn start(transcriber: Arc<dyn Transcriber>) -> RecognitionHandle {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(Self::worker_loop(transcriber, rx));
        RecognitionHandle { tx }
    }

    async fn worker_loop(transcriber: Arc<dyn Transcriber>, mut rx: mpsc::Receiver<Job>) {
        while let Some(job) = rx.recv().await {
            let backend = transcriber.clone();
            let samples = job.samples;

            // Inference is CPU-bound; run it on the blocking pool. The
            // loop awaits completion before taking the next job, which is
            // what keeps the backend single-entrant.
            let outcome =
                tokio::task::spawn_blocking(move || backend.transcribe(&samples)).await;

            let text = match outcome {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    warn!(error = %e, "transcription failed, treating as empty");
                    String::new()
                }
                Err(e) => {
                    warn!(error = %e, "transcription task panicked, treating as empty");
                    String::new()
                }
            };

            // Receiver may have timed out and been reclaimed; that is fine.
            if job.reply.send(text).is_err() {
                debug!("transcription result discarded, caller already gone");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, WardenError};
    use crate::stt::transcriber::MockTranscriber;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_queue_returns_backend_text() {
        let handle = RecognitionQueue::start(Arc::new(
            MockTranscriber::new("mock").with_response("hello queue"),
        ));
        assert_eq!(handle.transcribe(vec![0i16; 160]).await, "hello queue");
    }

    #[tokio::test]
    async fn test_backend_error_becomes_empty_text() {
        let handle =
            RecognitionQueue::start(Arc::new(MockTranscriber::new("mock").with_failure()));
        assert_eq!(handle.transcribe(vec![0i16; 160]).await, "");
    }

    #[tokio::test]
    async fn test_backend_panic_becomes_empty_text() {
        struct PanickingTranscriber;
        impl Transcriber for PanickingTranscriber {
            fn transcribe(&self, _audio: &[i16]) -> Result<String> {
                panic!("native state corrupted");
            }
            fn model_name(&self) -> &str {
                "panicking"
            }
            fn is_ready(&self) -> bool {
                true
            }
        }

        let handle = RecognitionQueue::start(Arc::new(PanickingTranscriber));
        assert_eq!(handle.transcribe(vec![0i16; 160]).await, "");

        // The worker loop must survive the panic and keep serving.
        assert_eq!(handle.transcribe(vec![0i16; 160]).await, "");
    }

    /// Transcriber that asserts it is never entered concurrently.
    struct ReentrancyProbe {
        entries: AtomicU32,
        peak: AtomicU32,
        calls: AtomicU32,
    }

    impl ReentrancyProbe {
        fn new() -> Self {
            Self {
                entries: AtomicU32::new(0),
                peak: AtomicU32::new(0),
                calls: AtomicU32::new(0),
            }
        }
    }

    impl Transcriber for ReentrancyProbe {
        fn transcribe(&self, _audio: &[i16]) -> Result<String> {
            let current = self.entries.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.entries.fetch_sub(1, Ordering::SeqCst);
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("call-{call}"))
        }

        fn model_name(&self) -> &str {
            "probe"
        }

        fn is_ready(&self) -> bool {
            true
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_two_calls_execute_concurrently() {
        let probe = Arc::new(ReentrancyProbe::new());
        let handle = RecognitionQueue::start(probe.clone() as Arc<dyn Transcriber>);

        let mut joins = Vec::new();
        for _ in 0..8 {
            let handle = handle.clone();
            joins.push(tokio::spawn(
                async move { handle.transcribe(vec![0i16; 16]).await },
            ));
        }
        for join in joins {
            join.await.unwrap();
        }

        assert_eq!(
            probe.peak.load(Ordering::SeqCst),
            1,
            "recognition resource was entered concurrently"
        );
        assert_eq!(probe.calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_fifo_ordering_across_submitters() {
        let probe = Arc::new(ReentrancyProbe::new());
        let handle = RecognitionQueue::start(probe as Arc<dyn Transcriber>);

        // Sequential submissions from one caller observe queue order.
        let first = handle.transcribe(vec![0i16; 16]).await;
        let second = handle.transcribe(vec![0i16; 16]).await;
        assert_eq!(first, "call-0");
        assert_eq!(second, "call-1");
    }

    #[tokio::test]
    async fn test_transcription_error_type_not_leaked() {
        struct ErrTranscriber;
        impl Transcriber for ErrTranscriber {
            fn transcribe(&self, _audio: &[i16]) -> Result<String> {
                Err(WardenError::InferenceFailed {
                    message: "decoder blew up".to_string(),
                })
            }
            fn model_name(&self) -> &str {
                "err"
            }
            fn is_ready(&self) -> bool {
                false
            }
        }

        let handle = RecognitionQueue::start(Arc::new(ErrTranscriber));
        // The contract is empty text, not an error.
        assert_eq!(handle.transcribe(vec![1i16; 16]).await, "");
    }
}
