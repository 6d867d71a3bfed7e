use serde_json::Value;
use thiserror::Error;

use tandem_shared::ConversationId;

/// A non-2xx response, normalized at the transport boundary.
///
/// Conflict payloads come in two shapes (`{"detail": {"chat_id": N}}` and
/// `{"chat_id": N}`); both end up in `conversation_id` so callers check a
/// single field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Server responded {status}: {detail}")]
pub struct ApiError {
    pub status: u16,
    /// Human-readable detail text.
    pub detail: String,
    /// Existing conversation named by a conflict response.
    pub conversation_id: Option<ConversationId>,
}

impl ApiError {
    pub fn new(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
            conversation_id: None,
        }
    }

    pub fn with_conversation(mut self, conversation_id: ConversationId) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    /// Build from a raw response body, which may or may not be JSON.
    pub fn from_body(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();

        let detail = parsed
            .as_ref()
            .and_then(detail_text)
            .unwrap_or_else(|| match body.trim() {
                "" => format!("HTTP {status}"),
                text => text.to_string(),
            });

        Self {
            status,
            detail,
            conversation_id: parsed.as_ref().and_then(conflict_conversation_id),
        }
    }

    /// A conversation with this counterpart already exists.
    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }

    /// The server refused because the caller targeted themself.
    pub fn is_self_target(&self) -> bool {
        self.status == 400 && self.detail.to_lowercase().contains("yourself")
    }
}

fn detail_text(payload: &Value) -> Option<String> {
    match payload.get("detail")? {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned),
        _ => None,
    }
}

fn conflict_conversation_id(payload: &Value) -> Option<ConversationId> {
    let raw = payload
        .get("detail")
        .and_then(|detail| detail.get("chat_id"))
        .or_else(|| payload.get("chat_id"))?;

    match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .map(ConversationId)
}

/// Errors produced by the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No access token is configured.
    #[error("Not authenticated: no access token")]
    MissingCredentials,

    /// Network or HTTP client failure without a structured payload.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Structured error response from the API.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// Push stream connection failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Response body did not match the expected shape.
    #[error("Invalid payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            TransportError::Api(err) => Some(err),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TransportError>;
