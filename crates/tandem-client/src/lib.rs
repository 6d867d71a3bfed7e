//! Chat core of the Tandem client: the timeline synchronizer and the chat
//! initiation resolver.

pub mod resolver;
pub mod state;
pub mod synchronizer;

#[cfg(test)]
mod testing;

pub use resolver::{ChatResolver, ResolveError};
pub use state::{AttachState, SeenMessages, StreamStatus, TimelineView};
pub use synchronizer::{SendError, SendOutcome, SkipReason, TimelineSynchronizer};

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global fmt subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("tandem_client=debug,tandem_net=debug,tandem_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
