//! Speech output (text-to-speech) capability contract.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::speech::Availability;

/// Events an output backend reports for one spoken utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    /// Audio playback has begun.
    Started,
    /// The utterance finished playing (or was cancelled).
    Ended,
    /// Synthesis or playback failed.
    Error(String),
}

/// Where output backends enqueue their events.
pub type OutputSink = mpsc::UnboundedSender<OutputEvent>;

/// Contract for speech output backends.
///
/// There is no queueing: `speak()` while an utterance is playing cancels it
/// first — newest request wins, which is what barge-in needs.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// One-time probe, answered without producing audio.
    fn availability(&self) -> Availability;

    /// Render `text` to speech, delivering events into `events`.
    ///
    /// # Errors
    /// - `ColloquyError::OutputUnavailable` if the runtime has no output.
    /// - `ColloquyError::Output` on synthesis failure.
    async fn speak(&self, text: &str, events: OutputSink) -> Result<()>;

    /// Cancel the active utterance, if any. Idempotent.
    async fn cancel(&self) -> Result<()>;
}
