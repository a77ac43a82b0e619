//! `VoiceController` — top-level voice turn-taking controller.
//!
//! ## Lifecycle
//!
//! ```text
//! VoiceController::initialize()
//!     └─► probes capabilities, issues the session id, spawns the turn loop
//!         └─► request_listen() / request_stop_listen() / set_voice_output_enabled()
//!             └─► teardown()    → loop drained, capture + output released
//! ```
//!
//! All entry points are non-blocking: they enqueue a command for the turn
//! loop, which is the only writer of controller state. Call `teardown()`
//! when done — it stops any active capture or speech and drains the loop
//! task; a dropped controller leaves the task parked until the runtime
//! shuts down.

pub(crate) mod turn_loop;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::info;

use crate::dialogue::DialogueService;
use crate::ipc::events::{
    ControllerState, ControllerStateEvent, NoticeEvent, TranscriptPreviewEvent, TurnReplyEvent,
};
use crate::session::{ConversationSession, SessionRegistry};
use crate::speakable::SpeechStyler;
use crate::speech::{Availability, SpeechCapture, SpeechOutput};

use self::turn_loop::{Command, ControllerEvent, LoopContext};

/// Broadcast channel capacity: 256 events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

const DEFAULT_GREETING: &str =
    "Hello! I'm your campus voice assistant. How can I help you today?";
const DEFAULT_APOLOGY: &str = "I'm sorry, I encountered an error. Please try again.";

/// Configuration for `VoiceController`.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Spoken once after initialization when voice output is on.
    /// `None` starts silent.
    pub greeting: Option<String>,
    /// Spoken/displayed when a dialogue turn fails for non-auth reasons.
    pub fallback_apology: String,
    /// Initial position of the voice-output toggle.
    pub voice_output_enabled: bool,
    /// Fixed seed for conversational phrase selection. `None` uses entropy.
    pub styler_seed: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            greeting: Some(DEFAULT_GREETING.into()),
            fallback_apology: DEFAULT_APOLOGY.into(),
            voice_output_enabled: true,
            styler_seed: None,
        }
    }
}

/// Handed to the external session collaborator when the dialogue service
/// rejects the bearer token. The collaborator owns re-authentication; the
/// controller never retries on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionExpired;

/// The voice turn-taking controller.
///
/// `VoiceController` is `Send + Sync` — all fields use interior mutability.
/// Wrap in `Arc<VoiceController>` to share between the UI shell and
/// event-forwarding tasks. Each instance owns its own session and state; two
/// instances never share anything.
pub struct VoiceController {
    session: ConversationSession,
    capture_availability: Availability,
    output_availability: Availability,
    /// Canonical state (written only by the turn loop).
    state: Arc<Mutex<ControllerState>>,
    /// Live interim transcript for display.
    preview: Arc<Mutex<String>>,
    voice_output_enabled: Arc<AtomicBool>,
    state_tx: broadcast::Sender<ControllerStateEvent>,
    preview_tx: broadcast::Sender<TranscriptPreviewEvent>,
    notice_tx: broadcast::Sender<NoticeEvent>,
    reply_tx: broadcast::Sender<TurnReplyEvent>,
    expired_tx: broadcast::Sender<SessionExpired>,
    events: mpsc::UnboundedSender<ControllerEvent>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl VoiceController {
    /// Create the controller and spawn its turn loop.
    ///
    /// Probes both capabilities exactly once; an unavailable capability is
    /// reported through one notice and its affordance disabled, leaving the
    /// rest of the controller usable in degraded mode. Must be called from
    /// within a Tokio runtime.
    pub fn initialize(
        config: ControllerConfig,
        capture: Arc<dyn SpeechCapture>,
        output: Arc<dyn SpeechOutput>,
        dialogue: Arc<dyn DialogueService>,
    ) -> Self {
        let session = SessionRegistry::new_session();
        let capture_availability = capture.availability();
        let output_availability = output.availability();

        let state = Arc::new(Mutex::new(ControllerState::Idle));
        let preview = Arc::new(Mutex::new(String::new()));
        let voice_output_enabled = Arc::new(AtomicBool::new(config.voice_output_enabled));

        let (state_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (preview_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (notice_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (reply_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (expired_tx, _) = broadcast::channel(BROADCAST_CAP);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        // Capability events are folded into the loop's single stream so the
        // machine sees one ordered sequence.
        let (capture_sink, mut capture_rx) = mpsc::unbounded_channel();
        let forward_tx = event_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = capture_rx.recv().await {
                if forward_tx.send(ControllerEvent::Capture(event)).is_err() {
                    break;
                }
            }
        });

        let (output_sink, mut output_rx) = mpsc::unbounded_channel();
        let forward_tx = event_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = output_rx.recv().await {
                if forward_tx.send(ControllerEvent::Output(event)).is_err() {
                    break;
                }
            }
        });

        let styler = match config.styler_seed {
            Some(seed) => SpeechStyler::seeded(seed),
            None => SpeechStyler::new(),
        };

        let ctx = LoopContext {
            config,
            session: session.clone(),
            capture,
            output,
            dialogue,
            styler,
            capture_availability,
            output_availability,
            state: Arc::clone(&state),
            preview: Arc::clone(&preview),
            voice_output_enabled: Arc::clone(&voice_output_enabled),
            state_tx: state_tx.clone(),
            preview_tx: preview_tx.clone(),
            notice_tx: notice_tx.clone(),
            reply_tx: reply_tx.clone(),
            expired_tx: expired_tx.clone(),
            capture_sink,
            output_sink,
            loop_tx: event_tx.clone(),
            preview_seq: 0,
            reply_seq: 0,
        };

        let loop_handle = tokio::spawn(turn_loop::run(ctx, event_rx));
        info!(session = %session, "voice controller initialized");

        Self {
            session,
            capture_availability,
            output_availability,
            state,
            preview,
            voice_output_enabled,
            state_tx,
            preview_tx,
            notice_tx,
            reply_tx,
            expired_tx,
            events: event_tx,
            loop_handle: Mutex::new(Some(loop_handle)),
        }
    }

    /// Ask to start listening.
    ///
    /// A no-op while already `Listening` (first request wins) or while a
    /// turn is in flight (`Dispatching`). While `Speaking` this is barge-in:
    /// output is cancelled before capture starts.
    pub fn request_listen(&self) {
        let _ = self.events.send(ControllerEvent::Command(Command::Listen));
    }

    /// Ask to stop listening, discarding any partial transcript. While
    /// `Speaking`, cancels the active utterance instead.
    pub fn request_stop_listen(&self) {
        let _ = self.events.send(ControllerEvent::Command(Command::StopListen));
    }

    /// Toggle voice output. Disabling mid-speech cancels the active
    /// utterance immediately; capture and dispatch are never affected.
    pub fn set_voice_output_enabled(&self, enabled: bool) {
        let _ = self
            .events
            .send(ControllerEvent::Command(Command::SetVoiceOutput(enabled)));
    }

    /// Stop the turn loop, releasing capture and output.
    pub async fn teardown(&self) {
        let _ = self.events.send(ControllerEvent::Command(Command::Teardown));
        let handle = self.loop_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Current state (snapshot).
    pub fn state(&self) -> ControllerState {
        *self.state.lock()
    }

    /// Current interim transcript (snapshot, empty when not listening).
    pub fn transcript_preview(&self) -> String {
        self.preview.lock().clone()
    }

    pub fn voice_output_enabled(&self) -> bool {
        self.voice_output_enabled.load(Ordering::SeqCst)
    }

    /// The conversation id sent with every dialogue call.
    pub fn session_id(&self) -> &str {
        self.session.id()
    }

    pub fn capture_availability(&self) -> Availability {
        self.capture_availability
    }

    pub fn output_availability(&self) -> Availability {
        self.output_availability
    }

    /// Subscribe to state change events.
    pub fn subscribe_state(&self) -> broadcast::Receiver<ControllerStateEvent> {
        self.state_tx.subscribe()
    }

    /// Subscribe to live interim transcript updates.
    pub fn subscribe_preview(&self) -> broadcast::Receiver<TranscriptPreviewEvent> {
        self.preview_tx.subscribe()
    }

    /// Subscribe to toast-style user notices.
    pub fn subscribe_notices(&self) -> broadcast::Receiver<NoticeEvent> {
        self.notice_tx.subscribe()
    }

    /// Subscribe to resolved turn replies (spoken or display-only).
    pub fn subscribe_replies(&self) -> broadcast::Receiver<TurnReplyEvent> {
        self.reply_tx.subscribe()
    }

    /// Subscribe to the session-expiry signal consumed by the external auth
    /// collaborator.
    pub fn subscribe_session_expired(&self) -> broadcast::Receiver<SessionExpired> {
        self.expired_tx.subscribe()
    }
}
