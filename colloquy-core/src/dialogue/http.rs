//! HTTP dialogue client.
//!
//! Wire format (one POST per turn):
//!
//! ```text
//! POST {base_url}/api/chatbot/chat
//! Authorization: Bearer <token>
//! { "message": "<utterance>", "session_id": "<session>" }
//!     → 200 { "response": "...", "intent": "...", "timestamp": "..." }
//!     → 401   token rejected — the auth collaborator must re-authenticate
//!     → 5xx   service fault
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::dialogue::{AccessTokenSource, DialogueReply, DialogueService};
use crate::error::{ColloquyError, Result};
use crate::session::ConversationSession;

const CHAT_PATH: &str = "/api/chatbot/chat";

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: &'a str,
}

/// Dialogue client over the academic service's chat endpoint.
pub struct HttpDialogueClient {
    http: reqwest::Client,
    base_url: String,
    token: Arc<dyn AccessTokenSource>,
}

impl HttpDialogueClient {
    pub fn new(base_url: impl Into<String>, token: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Impose a whole-request deadline; expiry surfaces as a network failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        self
    }

    fn chat_url(&self) -> String {
        format!("{}{}", self.base_url, CHAT_PATH)
    }
}

#[async_trait]
impl DialogueService for HttpDialogueClient {
    async fn send(&self, utterance: &str, session: &ConversationSession) -> Result<DialogueReply> {
        let body = ChatRequest {
            message: utterance,
            session_id: session.id(),
        };

        let mut request = self.http.post(self.chat_url()).json(&body);
        if let Some(token) = self.token.bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ColloquyError::DialogueNetwork(e.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), "dialogue round trip completed");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ColloquyError::DialogueUnauthorized);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ColloquyError::DialogueServer {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<DialogueReply>()
            .await
            .map_err(|e| ColloquyError::DialogueNetwork(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::StaticToken;

    #[test]
    fn chat_url_tolerates_trailing_slash() {
        let token: Arc<dyn AccessTokenSource> = Arc::new(StaticToken("t".into()));
        let with_slash = HttpDialogueClient::new("http://localhost:8000/", Arc::clone(&token));
        let without = HttpDialogueClient::new("http://localhost:8000", token);
        assert_eq!(with_slash.chat_url(), "http://localhost:8000/api/chatbot/chat");
        assert_eq!(without.chat_url(), with_slash.chat_url());
    }
}
