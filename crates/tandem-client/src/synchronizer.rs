//! Timeline synchronizer: binds a [`MessageStore`] to one conversation and
//! feeds it from the history fetch and the push stream.
//!
//! Fetch completion and stream deliveries may interleave in any order; the
//! store's idempotent insert keeps the timeline consistent. Every spawned
//! task carries the attach generation it was started for, and results for
//! an older generation are discarded instead of leaking into the next
//! conversation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tandem_net::{ReconnectPolicy, Transport, TransportError};
use tandem_shared::{ConversationId, Message};
use tandem_store::MessageStore;

use crate::state::{AttachState, StreamStatus, TimelineView};

/// Why a send was skipped without a network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyBody,
    NotAttached,
    NoCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Server accepted the message.
    Sent(Message),
    Skipped(SkipReason),
}

/// Send failure, returned to the caller and never stored as timeline state.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Failed to send message: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Default)]
struct Inner {
    attach_state: AttachState,
    stream_status: StreamStatus,
    /// Bumped on every teardown; identifies the current attach.
    generation: u64,
    store: MessageStore,
    fetches_in_flight: usize,
    /// Sequence number of the most recently started history fetch.
    fetches_started: u64,
    /// Newest fetch whose result has been applied.
    newest_applied_fetch: u64,
    error: Option<String>,
    sends_in_flight: usize,
    stream_task: Option<JoinHandle<()>>,
}

impl Inner {
    fn view(&self) -> TimelineView {
        TimelineView {
            attach_state: self.attach_state,
            stream_status: self.stream_status,
            messages: self.store.snapshot(),
            loading: self.fetches_in_flight > 0,
            error: self.error.clone(),
            sending: self.sends_in_flight > 0,
        }
    }

    fn teardown(&mut self) {
        if let Some(task) = self.stream_task.take() {
            task.abort();
        }
        if let Some(conversation) = self.attach_state.conversation() {
            info!(conversation = %conversation, "Detached from conversation");
        }

        self.generation += 1;
        self.attach_state = AttachState::Detached;
        self.stream_status = StreamStatus::Idle;
        self.store.reset();
        self.fetches_in_flight = 0;
        self.fetches_started = 0;
        self.newest_applied_fetch = 0;
        self.error = None;
        self.sends_in_flight = 0;
    }
}

struct Shared {
    inner: Mutex<Inner>,
    view_tx: watch::Sender<TimelineView>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.view_tx.send_replace(inner.view());
    }

    /// Run `f` and publish, unless the attach generation has moved on.
    fn update_if_current(&self, generation: u64, f: impl FnOnce(&mut Inner)) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        f(&mut inner);
        self.publish(&inner);
        true
    }
}

/// Live, deduplicated, ordered timeline of one conversation at a time.
///
/// `attach` spawns tasks, so it must be called from within a Tokio runtime.
pub struct TimelineSynchronizer {
    transport: Arc<dyn Transport>,
    reconnect: ReconnectPolicy,
    shared: Arc<Shared>,
}

impl TimelineSynchronizer {
    pub fn new(transport: Arc<dyn Transport>, reconnect: ReconnectPolicy) -> Self {
        let (view_tx, _) = watch::channel(TimelineView::default());
        Self {
            transport,
            reconnect,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                view_tx,
            }),
        }
    }

    /// Current snapshot.
    pub fn view(&self) -> TimelineView {
        self.shared.lock().view()
    }

    /// Receive a fresh [`TimelineView`] after every change.
    pub fn subscribe(&self) -> watch::Receiver<TimelineView> {
        self.shared.view_tx.subscribe()
    }

    pub fn attach_state(&self) -> AttachState {
        self.shared.lock().attach_state
    }

    /// Bind to `conversation`, or detach with `None`.
    ///
    /// Attaching to the conversation that is already attached is a no-op:
    /// no second fetch and no second stream. Any other change tears down
    /// the current conversation first.
    pub fn attach(&self, conversation: Option<ConversationId>) {
        let mut inner = self.shared.lock();

        if inner.attach_state.conversation() == conversation {
            debug!(?conversation, "Attach target unchanged");
            return;
        }

        inner.teardown();

        let Some(conversation) = conversation else {
            self.shared.publish(&inner);
            return;
        };

        if !self.transport.has_credentials() {
            warn!(conversation = %conversation, "No credentials, staying detached");
            self.shared.publish(&inner);
            return;
        }

        let generation = inner.generation;
        inner.attach_state = AttachState::Attaching(conversation);
        inner.stream_status = StreamStatus::Connecting;
        inner.fetches_in_flight = 1;
        inner.fetches_started = 1;
        inner.stream_task = Some(tokio::spawn(run_stream(
            self.transport.clone(),
            self.shared.clone(),
            self.reconnect,
            conversation,
            generation,
        )));
        self.shared.publish(&inner);
        drop(inner);

        info!(conversation = %conversation, "Attaching to conversation");
        tokio::spawn(fetch_history(
            self.transport.clone(),
            self.shared.clone(),
            conversation,
            generation,
            1,
        ));
    }

    pub fn detach(&self) {
        self.attach(None);
    }

    /// Fetch the full history again and replace the timeline with it.
    ///
    /// When fetches overlap, a response older than one already applied is
    /// dropped.
    pub async fn refetch(&self) {
        let (conversation, generation, seq) = {
            let mut inner = self.shared.lock();
            let Some(conversation) = inner.attach_state.conversation() else {
                return;
            };
            inner.fetches_in_flight += 1;
            inner.fetches_started += 1;
            self.shared.publish(&inner);
            (conversation, inner.generation, inner.fetches_started)
        };

        fetch_history(
            self.transport.clone(),
            self.shared.clone(),
            conversation,
            generation,
            seq,
        )
        .await;
    }

    /// Send `body` to the attached conversation.
    ///
    /// Blank bodies, a missing conversation or missing credentials skip the
    /// call. On success the returned message is merged into the timeline
    /// (a stream echo of the same id is deduplicated). Failures are
    /// returned, not recorded in [`TimelineView::error`].
    pub async fn send(&self, body: &str) -> Result<SendOutcome, SendError> {
        let body = body.trim();
        if body.is_empty() {
            return Ok(SendOutcome::Skipped(SkipReason::EmptyBody));
        }

        let (conversation, generation) = {
            let mut inner = self.shared.lock();
            let Some(conversation) = inner.attach_state.conversation() else {
                debug!("Send skipped: no conversation attached");
                return Ok(SendOutcome::Skipped(SkipReason::NotAttached));
            };
            if !self.transport.has_credentials() {
                debug!("Send skipped: no credentials");
                return Ok(SendOutcome::Skipped(SkipReason::NoCredentials));
            }
            inner.sends_in_flight += 1;
            self.shared.publish(&inner);
            (conversation, inner.generation)
        };

        let result = self.transport.send_message(conversation, body).await;

        let applied = self.shared.update_if_current(generation, |inner| {
            inner.sends_in_flight = inner.sends_in_flight.saturating_sub(1);
            if let Ok(ref message) = result {
                if !inner.store.ingest_one(message.clone()) {
                    debug!(id = %message.id, "Sent message already delivered by stream");
                }
            }
        });
        if !applied {
            debug!(conversation = %conversation, "Discarding stale send response");
        }

        match result {
            Ok(message) => {
                info!(conversation = %conversation, id = %message.id, "Message sent");
                Ok(SendOutcome::Sent(message))
            }
            Err(e) => {
                warn!(conversation = %conversation, error = %e, "Send failed");
                Err(e.into())
            }
        }
    }
}

impl Drop for TimelineSynchronizer {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        inner.teardown();
        self.shared.publish(&inner);
    }
}

async fn fetch_history(
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
    conversation: ConversationId,
    generation: u64,
    seq: u64,
) {
    let result = transport.list_messages(conversation).await;

    let applied = shared.update_if_current(generation, |inner| {
        if seq < inner.newest_applied_fetch {
            debug!(conversation = %conversation, seq, "Discarding superseded history response");
        } else {
            inner.newest_applied_fetch = seq;
            apply_history(inner, conversation, result);
        }

        inner.fetches_in_flight = inner.fetches_in_flight.saturating_sub(1);
        if let AttachState::Attaching(id) = inner.attach_state {
            inner.attach_state = AttachState::Attached(id);
        }
    });

    if !applied {
        debug!(conversation = %conversation, "Discarding stale history response");
    }
}

fn apply_history(
    inner: &mut Inner,
    conversation: ConversationId,
    result: Result<Vec<Message>, TransportError>,
) {
    match result {
        Ok(batch) => {
            info!(conversation = %conversation, count = batch.len(), "History loaded");
            inner.store.ingest_batch(batch);
            inner.error = None;
        }
        // Stream-delivered messages stay in place.
        Err(e) => {
            warn!(conversation = %conversation, error = %e, "History fetch failed");
            inner.error = Some(e.to_string());
        }
    }
}

/// Keep one push connection open for the attach, reconnecting per `policy`.
async fn run_stream(
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
    policy: ReconnectPolicy,
    conversation: ConversationId,
    generation: u64,
) {
    let mut attempt = 0u32;

    loop {
        match transport.open_message_stream(conversation).await {
            Ok(mut frames) => {
                if !shared.update_if_current(generation, |inner| {
                    inner.stream_status = StreamStatus::Open;
                }) {
                    return;
                }
                info!(conversation = %conversation, "Message stream open");
                attempt = 0;

                while let Some(frame) = frames.next().await {
                    match frame {
                        Ok(text) => {
                            if !apply_frame(&shared, generation, conversation, &text) {
                                return;
                            }
                        }
                        Err(e) => {
                            warn!(conversation = %conversation, error = %e, "Message stream failed");
                            break;
                        }
                    }
                }
                info!(conversation = %conversation, "Message stream closed");
            }
            Err(e) => {
                warn!(
                    conversation = %conversation,
                    attempt,
                    error = %e,
                    "Failed to open message stream"
                );
            }
        }

        let Some(delay) = policy.next_delay(attempt) else {
            shared.update_if_current(generation, |inner| {
                inner.stream_status = StreamStatus::Closed;
            });
            warn!(conversation = %conversation, "Giving up on message stream");
            return;
        };
        attempt += 1;

        if !shared.update_if_current(generation, |inner| {
            inner.stream_status = StreamStatus::RetryPending { attempt };
        }) {
            return;
        }
        debug!(conversation = %conversation, attempt, ?delay, "Reconnecting message stream");
        tokio::time::sleep(delay).await;

        if !shared.update_if_current(generation, |inner| {
            inner.stream_status = StreamStatus::Connecting;
        }) {
            return;
        }
    }
}

/// Merge one stream frame. Returns `false` once the attach is stale.
fn apply_frame(shared: &Shared, generation: u64, conversation: ConversationId, text: &str) -> bool {
    let message = match Message::from_json(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(conversation = %conversation, error = %e, "Dropping malformed stream payload");
            return true;
        }
    };

    let mut inner = shared.lock();
    if inner.generation != generation {
        return false;
    }
    if inner.store.ingest_one(message) {
        shared.publish(&inner);
    } else {
        debug!(conversation = %conversation, "Duplicate stream message ignored");
    }
    true
}
