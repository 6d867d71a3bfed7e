//! Navigation targets produced by the chat resolver.

use crate::constants::{ROUTE_CHATS, ROUTE_CHAT_REQUESTS};
use crate::types::{ConversationId, RequestId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// An existing conversation.
    Conversation(ConversationId),
    /// A chat request awaiting the counterpart's answer.
    PendingRequest(RequestId),
    /// Draft view for a first message to this user.
    Compose(UserId),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Conversation(id) => format!("{ROUTE_CHATS}/{id}"),
            Route::PendingRequest(id) => format!("{ROUTE_CHAT_REQUESTS}/{id}"),
            Route::Compose(user) => format!("{ROUTE_CHATS}/new?user={user}"),
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}
