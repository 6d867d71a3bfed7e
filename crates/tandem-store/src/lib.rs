//! # tandem-store
//!
//! In-memory message storage for one conversation at a time.
//!
//! The [`MessageStore`] is the single owner of a conversation's messages.
//! It deduplicates by message id and keeps messages ordered by creation
//! time so that the history fetch and the push stream can feed it in any
//! interleaving.

pub mod messages;

pub use messages::MessageStore;
