//! # colloquy-core
//!
//! Reusable voice conversation engine SDK.
//!
//! ## Architecture
//!
//! ```text
//! SpeechCapture ──CaptureEvent──►┐
//!                                │
//! SpeechOutput ───OutputEvent───►├─► mpsc ─► turn loop (single writer)
//!                                │              │
//! DialogueService ──reply/err───►┘        state machine
//!                                               │
//!                     broadcast::Sender<{State, Preview, Notice, Reply}>
//! ```
//!
//! Capability adapters never touch controller state: they enqueue typed
//! events, and the turn loop interprets each one against the current state.
//! Events arriving in an unexpected state are ignored, so late callbacks
//! from sloppy adapters cannot corrupt the machine.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod controller;
pub mod dialogue;
pub mod error;
pub mod ipc;
pub mod session;
pub mod speakable;
pub mod speech;

// Convenience re-exports for downstream crates
pub use controller::{ControllerConfig, SessionExpired, VoiceController};
pub use dialogue::{AccessTokenSource, DialogueReply, DialogueService, StaticToken};
pub use error::ColloquyError;
pub use ipc::events::{
    ControllerState, ControllerStateEvent, NoticeEvent, NoticeLevel, TranscriptPreviewEvent,
    TurnReplyEvent,
};
pub use session::{ConversationSession, SessionRegistry};
pub use speakable::SpeechStyler;
pub use speech::{Availability, CaptureEvent, OutputEvent, SpeechCapture, SpeechOutput};

#[cfg(feature = "http")]
pub use dialogue::http::HttpDialogueClient;
