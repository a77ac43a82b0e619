//! Dialogue service boundary.
//!
//! One request per turn, no retries: turns are cheap and user-initiated, so
//! a failed round trip is surfaced and the user simply speaks again.

#[cfg(feature = "http")]
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::ConversationSession;

/// Reply payload of the remote dialogue service.
///
/// Only `response` and `timestamp` are guaranteed; the service may also echo
/// the classified intent, its confidence, and the session id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueReply {
    pub response: String,
    pub timestamp: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Contract for the remote dialogue exchange.
///
/// # Errors
/// Implementations resolve failures to exactly one of
/// `ColloquyError::DialogueUnauthorized`, `ColloquyError::DialogueNetwork`,
/// or `ColloquyError::DialogueServer`.
#[async_trait]
pub trait DialogueService: Send + Sync {
    /// Send one user utterance under the given session and await the reply.
    async fn send(&self, utterance: &str, session: &ConversationSession) -> Result<DialogueReply>;
}

/// Supplies the bearer token for dialogue calls.
///
/// Token lifecycle (issuing, refresh, revocation) belongs to the external
/// auth collaborator; the controller only reads whatever is current.
pub trait AccessTokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token, for hosts that authenticate once up front.
pub struct StaticToken(pub String);

impl AccessTokenSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_deserializes_with_optional_fields_missing() {
        let reply: DialogueReply = serde_json::from_str(
            r#"{"response": "Exams start Monday.", "timestamp": "2026-02-11T09:00:00"}"#,
        )
        .expect("deserialize minimal reply");
        assert_eq!(reply.response, "Exams start Monday.");
        assert!(reply.intent.is_none());
        assert!(reply.confidence.is_none());
        assert!(reply.session_id.is_none());
    }

    #[test]
    fn reply_deserializes_with_full_service_payload() {
        let reply: DialogueReply = serde_json::from_str(
            r#"{
                "response": "CS201 meets in room 4.",
                "intent": "course_info",
                "confidence": 0.91,
                "timestamp": "2026-02-11T09:00:00",
                "session_id": "voice-session-1-abc"
            }"#,
        )
        .expect("deserialize full reply");
        assert_eq!(reply.intent.as_deref(), Some("course_info"));
        assert_eq!(reply.session_id.as_deref(), Some("voice-session-1-abc"));
    }
}
