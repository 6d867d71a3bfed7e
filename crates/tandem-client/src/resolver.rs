//! Chat initiation: decide how to reach a conversation with another user.
//!
//! The existing-conversation lookup always runs before any creation call so
//! the same pair does not end up with two conversations. A 409 from the
//! creation call covers the race where one was created in between.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use tandem_net::{Transport, TransportError};
use tandem_shared::{ConversationId, Route, UserId};

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The user tried to start a conversation with themself. The message is
    /// meant to be shown as-is.
    #[error("You cannot start a conversation with yourself")]
    SelfTarget,

    /// A transport failure that could not be turned into a route.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ResolveError {
    pub fn is_self_target(&self) -> bool {
        matches!(self, ResolveError::SelfTarget)
    }
}

/// Stateless; safe to share and call concurrently.
#[derive(Clone)]
pub struct ChatResolver {
    transport: Arc<dyn Transport>,
}

impl ChatResolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Conversation already shared with `counterpart`, if any.
    ///
    /// A failed lookup is logged and reported as "none" so the caller can
    /// still fall through to creation.
    pub async fn find_existing_conversation(&self, counterpart: UserId) -> Option<ConversationId> {
        match self.transport.list_conversations().await {
            Ok(conversations) => conversations
                .into_iter()
                .find(|c| c.counterpart_user_id == counterpart)
                .map(|c| c.conversation_id),
            Err(e) => {
                warn!(counterpart = %counterpart, error = %e, "Conversation lookup failed");
                None
            }
        }
    }

    /// "Send first message" flow: route to the existing conversation, or
    /// create a chat request carrying `initial_message`.
    ///
    /// `navigate` is called once with the resulting route.
    pub async fn resolve_and_route(
        &self,
        counterpart: UserId,
        initial_message: &str,
        current_user: UserId,
        navigate: impl FnOnce(&Route),
    ) -> Result<Route, ResolveError> {
        if counterpart == current_user {
            return Err(ResolveError::SelfTarget);
        }

        let route = match self.find_existing_conversation(counterpart).await {
            Some(conversation) => {
                debug!(counterpart = %counterpart, conversation = %conversation, "Using existing conversation");
                Route::Conversation(conversation)
            }
            None => self.create_request(counterpart, initial_message).await?,
        };

        info!(counterpart = %counterpart, route = %route, "Chat resolved");
        navigate(&route);
        Ok(route)
    }

    /// Like [`Self::resolve_and_route`], but routes to the compose view
    /// instead of creating a request when no conversation exists.
    pub async fn resolve_and_route_or_compose(
        &self,
        counterpart: UserId,
        current_user: UserId,
        navigate: impl FnOnce(&Route),
    ) -> Result<Route, ResolveError> {
        if counterpart == current_user {
            return Err(ResolveError::SelfTarget);
        }

        let route = self
            .find_existing_conversation(counterpart)
            .await
            .map(Route::Conversation)
            .unwrap_or(Route::Compose(counterpart));

        navigate(&route);
        Ok(route)
    }

    async fn create_request(
        &self,
        counterpart: UserId,
        initial_message: &str,
    ) -> Result<Route, ResolveError> {
        match self
            .transport
            .create_chat_request(counterpart, initial_message)
            .await
        {
            Ok(request) => Ok(match request.chat_id {
                Some(conversation) => Route::Conversation(conversation),
                None => Route::PendingRequest(request.request_id),
            }),
            Err(TransportError::Api(api)) if api.is_self_target() => Err(ResolveError::SelfTarget),
            Err(TransportError::Api(api)) if api.is_conflict() => match api.conversation_id {
                Some(conversation) => {
                    info!(counterpart = %counterpart, conversation = %conversation, "Conversation created concurrently, routing to it");
                    Ok(Route::Conversation(conversation))
                }
                None => Err(TransportError::Api(api).into()),
            },
            Err(e) => Err(e.into()),
        }
    }
}
