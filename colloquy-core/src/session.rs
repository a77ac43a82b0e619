//! Conversation session identity.
//!
//! The session id is a correlation key only — it groups the turns of one
//! conversation for the remote dialogue service. It is not a security
//! boundary, so a millisecond timestamp plus a short random suffix gives
//! all the collision resistance required.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Number of random characters appended after the timestamp.
const SUFFIX_LEN: usize = 9;

/// An immutable conversation identity held for the controller's lifetime.
///
/// Created exactly once per controller instance and discarded with it —
/// sessions are never persisted or merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSession {
    id: String,
}

impl ConversationSession {
    /// The opaque session id, exposed read-only for dialogue calls.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// Issues conversation sessions.
pub struct SessionRegistry;

impl SessionRegistry {
    /// Generate a fresh session id: `voice-session-<unix millis>-<suffix>`.
    pub fn new_session() -> ConversationSession {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(|b| (b as char).to_ascii_lowercase())
            .collect();
        ConversationSession {
            id: format!("voice-session-{}-{}", Utc::now().timestamp_millis(), suffix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_carry_the_expected_prefix_and_suffix_length() {
        let session = SessionRegistry::new_session();
        let parts: Vec<&str> = session.id().splitn(4, '-').collect();
        assert_eq!(parts[0], "voice");
        assert_eq!(parts[1], "session");
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[3].len(), SUFFIX_LEN);
        assert!(parts[3].chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(!parts[3].chars().any(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn consecutive_sessions_do_not_collide() {
        let a = SessionRegistry::new_session();
        let b = SessionRegistry::new_session();
        assert_ne!(a.id(), b.id());
    }
}
