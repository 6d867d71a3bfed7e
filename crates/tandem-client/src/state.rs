//! Observable state of the timeline synchronizer.
//!
//! A [`TimelineView`] is published through a `tokio::sync::watch` channel
//! after every change so the presentation layer can render it directly.

use std::collections::HashSet;

use tandem_shared::{ConversationId, Message, MessageId};

/// Binding of the synchronizer to a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachState {
    /// No conversation selected, or no credentials.
    #[default]
    Detached,
    /// History fetch in flight; the stream task has been started.
    Attaching(ConversationId),
    /// History fetch finished (successfully or not).
    Attached(ConversationId),
}

impl AttachState {
    pub fn conversation(&self) -> Option<ConversationId> {
        match self {
            AttachState::Detached => None,
            AttachState::Attaching(id) | AttachState::Attached(id) => Some(*id),
        }
    }
}

/// Health of the push stream of the attached conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStatus {
    #[default]
    Idle,
    Connecting,
    Open,
    /// Waiting before reconnect number `attempt` (1-based).
    RetryPending { attempt: u32 },
    /// Given up until the next attach.
    Closed,
}

/// Read-only snapshot handed to consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineView {
    pub attach_state: AttachState,
    pub stream_status: StreamStatus,
    /// Ordered ascending by creation time, one entry per message id.
    pub messages: Vec<Message>,
    /// History fetch in flight.
    pub loading: bool,
    /// Last history fetch failure.
    pub error: Option<String>,
    /// At least one send in flight.
    pub sending: bool,
}

impl TimelineView {
    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.attach_state.conversation()
    }
}

/// Remembers which timeline messages a consumer has already rendered.
///
/// Older messages can be inserted ahead of ones already shown, so new
/// entries are found by id rather than by position.
#[derive(Debug, Default)]
pub struct SeenMessages {
    seen: HashSet<MessageId>,
}

impl SeenMessages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of `view` not returned by an earlier call, in timeline order.
    pub fn unseen<'a>(&mut self, view: &'a TimelineView) -> Vec<&'a Message> {
        view.messages
            .iter()
            .filter(|message| self.seen.insert(message.id))
            .collect()
    }
}
