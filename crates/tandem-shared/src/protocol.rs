use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ConversationId, MessageId, RequestId, UserId};

/// A chat message as delivered by the history endpoint, the send endpoint
/// and the push stream. Immutable once observed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique within its conversation; the deduplication key.
    pub id: MessageId,
    pub sender_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_display_name: Option<String>,
}

impl Message {
    /// Decode one stream frame. Each frame carries exactly one message.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One entry of the caller's conversation list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub counterpart_user_id: UserId,
    pub counterpart_display_name: String,
    #[serde(default)]
    pub last_message: Option<Message>,
}

/// Result of proposing a conversation to another user.
///
/// When the server decides a conversation already exists it fills
/// `chat_id` and the caller can route there directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub request_id: RequestId,
    #[serde(default)]
    pub chat_id: Option<ConversationId>,
}

/// `{ "items": [...] }` envelope used by every list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
}
