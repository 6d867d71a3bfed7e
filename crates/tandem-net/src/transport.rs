use async_trait::async_trait;
use futures::stream::BoxStream;

use tandem_shared::{ChatRequest, ConversationId, ConversationSummary, Message, UserId};

use crate::error::Result;

/// Raw text frames from one push connection. Each frame is expected to be
/// one JSON-encoded [`Message`]; decoding is left to the consumer so a bad
/// frame can be dropped without tearing the connection down.
pub type FrameStream = BoxStream<'static, Result<String>>;

/// Authenticated request/response calls plus per-conversation push streams.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether an access token is available.
    fn has_credentials(&self) -> bool;

    /// Full message history of a conversation, in one call.
    async fn list_messages(&self, conversation: ConversationId) -> Result<Vec<Message>>;

    async fn send_message(&self, conversation: ConversationId, body: &str) -> Result<Message>;

    /// The caller's conversations.
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>>;

    /// Propose a conversation. Fails with a 400 [`crate::ApiError`] for a
    /// self-targeted request and a 409 when a conversation already exists.
    async fn create_chat_request(
        &self,
        counterpart: UserId,
        initial_message: &str,
    ) -> Result<ChatRequest>;

    /// Open exactly one push connection for the conversation.
    async fn open_message_stream(&self, conversation: ConversationId) -> Result<FrameStream>;
}
