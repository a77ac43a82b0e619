//! Event types published over the controller's broadcast channels.
//!
//! ## Channels
//!
//! | Event | Subscription |
//! |-------|--------------|
//! | `ControllerStateEvent` | `VoiceController::subscribe_state` |
//! | `TranscriptPreviewEvent` | `VoiceController::subscribe_preview` |
//! | `NoticeEvent` | `VoiceController::subscribe_notices` |
//! | `TurnReplyEvent` | `VoiceController::subscribe_replies` |
//!
//! All types serialize camelCase so a UI layer can forward them verbatim.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Controller state
// ---------------------------------------------------------------------------

/// Phase of the voice turn loop. Exactly one holds at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerState {
    /// Ready for the next turn.
    Idle,
    /// Capture is running; interim transcripts may arrive.
    Listening,
    /// A dialogue round trip is in flight. The mic is non-actionable.
    Dispatching,
    /// Speech output is playing the reply. Listen requests barge in.
    Speaking,
    /// Transient fault marker — always followed immediately by `Idle`.
    Error,
}

/// Emitted whenever the controller changes state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStateEvent {
    pub state: ControllerState,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

// ---------------------------------------------------------------------------
// Transcript preview
// ---------------------------------------------------------------------------

/// Interim transcript for live display while listening.
///
/// An empty `text` clears the preview (capture ended or was discarded).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptPreviewEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    pub text: String,
}

// ---------------------------------------------------------------------------
// User-facing notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// One-shot, toast-style user notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeEvent {
    pub level: NoticeLevel,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Turn replies
// ---------------------------------------------------------------------------

/// The resolved exchange of one turn, published whether or not it is spoken
/// aloud, so a display layer can always render the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReplyEvent {
    /// Monotonically increasing turn sequence number.
    pub seq: u64,
    /// The user's final transcript as dispatched.
    pub utterance: String,
    /// Raw reply text from the dialogue service.
    pub reply: String,
    /// The normalized text handed to speech output (derived from `reply`).
    pub spoken: String,
    /// Intent classified by the service, when it reports one.
    pub intent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_event_serializes_with_lowercase_state() {
        let event = ControllerStateEvent {
            state: ControllerState::Dispatching,
            detail: None,
        };

        let json = serde_json::to_value(&event).expect("serialize state event");
        assert_eq!(json["state"], "dispatching");
        assert_eq!(json["detail"], serde_json::Value::Null);

        let round_trip: ControllerStateEvent =
            serde_json::from_value(json).expect("deserialize state event");
        assert_eq!(round_trip.state, ControllerState::Dispatching);
    }

    #[test]
    fn controller_state_rejects_non_lowercase_values() {
        let invalid = r#""Listening""#;
        let err = serde_json::from_str::<ControllerState>(invalid);
        assert!(err.is_err(), "expected invalid casing to fail");
    }

    #[test]
    fn notice_event_serializes_with_lowercase_level() {
        let event = NoticeEvent {
            level: NoticeLevel::Success,
            message: "Listening... Speak now!".into(),
        };

        let json = serde_json::to_value(&event).expect("serialize notice");
        assert_eq!(json["level"], "success");
        assert_eq!(json["message"], "Listening... Speak now!");
    }

    #[test]
    fn turn_reply_event_serializes_with_camel_case_fields() {
        let event = TurnReplyEvent {
            seq: 4,
            utterance: "what is the exam schedule".into(),
            reply: "Exams start **Monday**.".into(),
            spoken: "Exams start Monday.".into(),
            intent: Some("exam_schedule".into()),
        };

        let json = serde_json::to_value(&event).expect("serialize reply event");
        assert_eq!(json["seq"], 4);
        assert_eq!(json["utterance"], "what is the exam schedule");
        assert_eq!(json["spoken"], "Exams start Monday.");
        assert_eq!(json["intent"], "exam_schedule");

        let round_trip: TurnReplyEvent =
            serde_json::from_value(json).expect("deserialize reply event");
        assert_eq!(round_trip.seq, 4);
        assert_eq!(round_trip.intent.as_deref(), Some("exam_schedule"));
    }

    #[test]
    fn preview_event_serializes_with_camel_case_fields() {
        let event = TranscriptPreviewEvent {
            seq: 2,
            text: "what is the".into(),
        };

        let json = serde_json::to_value(&event).expect("serialize preview");
        assert_eq!(json["seq"], 2);
        assert_eq!(json["text"], "what is the");
    }
}
