//! Speech capture (speech-to-text) capability contract.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::speech::Availability;

/// Events a capture backend reports for one recognition session.
///
/// For a single session the well-behaved order is `Started`, zero or more
/// `Interim`s, at most one `Final`, then `Ended`. The controller tolerates
/// deviations (late or duplicated events are ignored against state), so
/// adapters over callback-happy platform APIs do not need to deduplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// The microphone is open and recognition is running.
    Started,
    /// A provisional transcript — display only, may change.
    Interim(String),
    /// The committed transcript for this speech act.
    Final(String),
    /// Recognition failed; the payload names the platform error kind.
    Error(String),
    /// The session is over, with or without a final transcript.
    Ended,
}

/// Where capture backends enqueue their events.
pub type CaptureSink = mpsc::UnboundedSender<CaptureEvent>;

/// Contract for speech capture backends.
///
/// At most one recognition session may be active per adapter; `start()`
/// while a session is running is an error, never a second overlapping
/// session. `stop()` before a `Final` discards the utterance silently.
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    /// One-time probe, answered without opening the microphone.
    fn availability(&self) -> Availability;

    /// Begin a recognition session, delivering events into `events`.
    ///
    /// # Errors
    /// - `ColloquyError::CaptureUnavailable` if the runtime has no capture.
    /// - `ColloquyError::Capture` if a session is already active or the
    ///   backend fails to open.
    async fn start(&self, events: CaptureSink) -> Result<()>;

    /// End the active session, if any. Idempotent.
    async fn stop(&self) -> Result<()>;
}
