//! Domain types shared by the transport, store and client crates.

pub mod constants;
pub mod protocol;
pub mod route;
pub mod types;

pub use protocol::{ChatRequest, ConversationSummary, ListResponse, Message};
pub use route::Route;
pub use types::{ConversationId, MessageId, RequestId, UserId};
