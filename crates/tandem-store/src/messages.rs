use std::collections::HashSet;

use tracing::trace;

use tandem_shared::{Message, MessageId};

/// Deduplicated, time-ordered messages of exactly one conversation.
///
/// Messages are kept sorted ascending by `created_at`; equal timestamps
/// keep their arrival order. Ids are unique and a stored message is never
/// replaced by a later delivery of the same id.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    ids: HashSet<MessageId>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every message.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.ids.clear();
    }

    /// Replace the whole content with a freshly fetched history.
    ///
    /// This is an overwrite, not a merge: ids absent from `batch` are gone
    /// afterwards. Repeated ids inside the batch keep their first occurrence.
    pub fn ingest_batch(&mut self, batch: Vec<Message>) {
        self.reset();

        for message in batch {
            if self.ids.insert(message.id) {
                self.messages.push(message);
            }
        }
        // Stable sort, so equal timestamps keep batch order.
        self.messages.sort_by_key(|m| m.created_at);
    }

    /// Insert `message` unless its id is already stored.
    ///
    /// Returns `true` when the message was inserted.
    pub fn ingest_one(&mut self, message: Message) -> bool {
        if !self.ids.insert(message.id) {
            trace!(id = %message.id, "Duplicate message ignored");
            return false;
        }

        let pos = self
            .messages
            .partition_point(|m| m.created_at <= message.created_at);
        self.messages.insert(pos, message);
        true
    }

    /// Ordered copy of the stored messages.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
