//! Chat transport
//!
//! One JSON POST per message, no retries:
//!
//! ```json
//! // request
//! { "message": "...", "skill_domain": "business", "read_books": ["Deep Work"] }
//! // success
//! { "response": "..." }
//! // failure
//! { "error": "..." }
//! ```

use crate::domain::SkillDomain;
use crate::{Result, UpskillError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Shown when the server fails without saying why
const GENERIC_FAILURE: &str = "Failed to get response";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub skill_domain: SkillDomain,
    /// Titles of books marked as read
    pub read_books: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Something that can answer a chat request with reply text
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<String>;
}

/// HTTP transport to the assistant endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(15))
            .user_agent(concat!("upskill/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_reqwest_error(e: reqwest::Error) -> UpskillError {
        if e.is_timeout() {
            UpskillError::Transport(format!("timeout: {e}"))
        } else if e.is_connect() {
            UpskillError::Transport(format!("network: {e}"))
        } else {
            UpskillError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<String> {
        debug!(
            "POST {} (domain={}, read_books={})",
            self.endpoint,
            request.skill_domain,
            request.read_books.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(Self::map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(Self::map_reqwest_error)?;
        if !status.is_success() {
            warn!("Chat endpoint returned {}", status);
        }
        parse_reply(status.is_success(), &body)
    }
}

/// Interpret a chat endpoint body.
///
/// Failures surface the server's `error` field when it has one.
pub fn parse_reply(success: bool, body: &str) -> Result<String> {
    let parsed = serde_json::from_str::<ChatResponseBody>(body);

    if !success {
        let detail = parsed
            .ok()
            .and_then(|b| b.error)
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        return Err(UpskillError::Transport(detail));
    }

    let parsed = parsed.map_err(|e| UpskillError::Payload(e.to_string()))?;
    if let Some(error) = parsed.error {
        return Err(UpskillError::Transport(error));
    }
    parsed
        .response
        .ok_or_else(|| UpskillError::Payload("missing 'response' field".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = ChatRequest {
            message: "What should I read?".to_string(),
            skill_domain: SkillDomain::DataScience,
            read_books: vec!["Deep Work".to_string()],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["skill_domain"], "data-science");
        assert_eq!(json["read_books"][0], "Deep Work");
        assert_eq!(json["message"], "What should I read?");
    }

    #[test]
    fn test_parse_success() {
        let text = parse_reply(true, r#"{"response": "Read \"Range\"."}"#).unwrap();
        assert_eq!(text, "Read \"Range\".");
    }

    #[test]
    fn test_parse_server_error() {
        let err = parse_reply(false, r#"{"error": "model offline"}"#).unwrap_err();
        assert_eq!(err.to_string(), "model offline");

        let err = parse_reply(false, "<html>502</html>").unwrap_err();
        assert_eq!(err.to_string(), GENERIC_FAILURE);

        let err = parse_reply(true, r#"{"error": "quota exceeded"}"#).unwrap_err();
        assert!(matches!(err, UpskillError::Transport(_)));
    }

    #[test]
    fn test_parse_malformed_payload() {
        assert!(matches!(
            parse_reply(true, "not json"),
            Err(UpskillError::Payload(_))
        ));
        assert!(matches!(
            parse_reply(true, r#"{"answer": "hi"}"#),
            Err(UpskillError::Payload(_))
        ));
    }
}
