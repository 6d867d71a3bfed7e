// In-memory Transport fake shared by the synchronizer and resolver tests.
//
// Responses are scripted per call; every call is recorded so tests can
// assert on what did (or did not) hit the network.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::channel::mpsc;
use futures::StreamExt;
use tokio::sync::{watch, Semaphore};

use tandem_net::{ApiError, FrameStream, Result, Transport, TransportError};
use tandem_shared::{
    ChatRequest, ConversationId, ConversationSummary, Message, MessageId, UserId,
};

use crate::state::TimelineView;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_714_557_600 + secs, 0).unwrap()
}

pub fn msg(id: i64, secs: i64) -> Message {
    Message {
        id: MessageId(id),
        sender_id: UserId(100),
        body: format!("message {id}"),
        created_at: at(secs),
        sender_display_name: Some("Sam".into()),
    }
}

pub fn frame(message: &Message) -> String {
    message.to_json().unwrap()
}

pub fn server_error(status: u16, body: &str) -> TransportError {
    TransportError::Api(ApiError::from_body(status, body))
}

pub fn summary(conversation: i64, counterpart: i64) -> ConversationSummary {
    ConversationSummary {
        conversation_id: ConversationId(conversation),
        counterpart_user_id: UserId(counterpart),
        counterpart_display_name: format!("user {counterpart}"),
        last_message: None,
    }
}

/// Wait (bounded) until the published view satisfies `pred`.
pub async fn wait_for_view(
    rx: &mut watch::Receiver<TimelineView>,
    pred: impl FnMut(&TimelineView) -> bool,
) -> TimelineView {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for timeline view")
        .expect("view channel closed")
        .clone()
}

/// Let spawned tasks run for a moment.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

pub struct MockTransport {
    authenticated: AtomicBool,
    calls: Mutex<Vec<String>>,
    history: Mutex<HashMap<ConversationId, VecDeque<Result<Vec<Message>>>>>,
    history_gate: Mutex<Option<std::sync::Arc<Semaphore>>>,
    sends: Mutex<VecDeque<Result<Message>>>,
    send_gate: Mutex<Option<std::sync::Arc<Semaphore>>>,
    conversations: Mutex<VecDeque<Result<Vec<ConversationSummary>>>>,
    chat_requests: Mutex<VecDeque<Result<ChatRequest>>>,
    failing_stream_opens: AtomicUsize,
    streams: Mutex<Vec<mpsc::UnboundedSender<Result<String>>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            authenticated: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
            history: Mutex::new(HashMap::new()),
            history_gate: Mutex::new(None),
            sends: Mutex::new(VecDeque::new()),
            send_gate: Mutex::new(None),
            conversations: Mutex::new(VecDeque::new()),
            chat_requests: Mutex::new(VecDeque::new()),
            failing_stream_opens: AtomicUsize::new(0),
            streams: Mutex::new(Vec::new()),
        }
    }

    pub fn unauthenticated() -> Self {
        let mock = Self::new();
        mock.authenticated.store(false, Ordering::SeqCst);
        mock
    }

    pub fn with_history(self, conversation: i64, result: Result<Vec<Message>>) -> Self {
        self.history
            .lock()
            .unwrap()
            .entry(ConversationId(conversation))
            .or_default()
            .push_back(result);
        self
    }

    pub fn with_send(self, result: Result<Message>) -> Self {
        self.sends.lock().unwrap().push_back(result);
        self
    }

    pub fn with_conversations(self, result: Result<Vec<ConversationSummary>>) -> Self {
        self.conversations.lock().unwrap().push_back(result);
        self
    }

    pub fn with_chat_request(self, result: Result<ChatRequest>) -> Self {
        self.chat_requests.lock().unwrap().push_back(result);
        self
    }

    /// The next `n` stream opens fail.
    pub fn with_failing_stream_opens(self, n: usize) -> Self {
        self.failing_stream_opens.store(n, Ordering::SeqCst);
        self
    }

    /// History calls block until [`Self::release_history`].
    pub fn hold_history(self) -> Self {
        *self.history_gate.lock().unwrap() = Some(std::sync::Arc::new(Semaphore::new(0)));
        self
    }

    pub fn release_history(&self, n: usize) {
        if let Some(gate) = self.history_gate.lock().unwrap().as_ref() {
            gate.add_permits(n);
        }
    }

    /// Let later history calls through. Returns the gate still blocking
    /// the calls already waiting on it.
    pub fn pass_history_through(&self) -> Option<std::sync::Arc<Semaphore>> {
        self.history_gate.lock().unwrap().take()
    }

    /// Send calls block until [`Self::release_sends`].
    pub fn hold_sends(self) -> Self {
        *self.send_gate.lock().unwrap() = Some(std::sync::Arc::new(Semaphore::new(0)));
        self
    }

    pub fn release_sends(&self, n: usize) {
        if let Some(gate) = self.send_gate.lock().unwrap().as_ref() {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == name)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn stream_opens(&self) -> usize {
        self.calls("open_message_stream")
    }

    /// Deliver a frame on the most recently opened stream.
    pub fn push_frame(&self, text: impl Into<String>) {
        let streams = self.streams.lock().unwrap();
        let tx = streams.last().expect("no stream opened");
        tx.unbounded_send(Ok(text.into())).expect("stream receiver dropped");
    }

    pub fn push_error(&self, err: TransportError) {
        let streams = self.streams.lock().unwrap();
        let tx = streams.last().expect("no stream opened");
        tx.unbounded_send(Err(err)).expect("stream receiver dropped");
    }

    /// Server-side close of the most recently opened stream.
    pub fn close_stream(&self) {
        if let Some(tx) = self.streams.lock().unwrap().last() {
            tx.close_channel();
        }
    }

    /// Whether the consumer side of stream number `index` is gone.
    pub fn stream_dropped(&self, index: usize) -> bool {
        self.streams.lock().unwrap()[index].is_closed()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }

    async fn pass(gate: &Mutex<Option<std::sync::Arc<Semaphore>>>) {
        let gate = gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn has_credentials(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn list_messages(&self, conversation: ConversationId) -> Result<Vec<Message>> {
        self.record("list_messages");
        // Responses follow call order, however the gate releases them.
        let response = self
            .history
            .lock()
            .unwrap()
            .get_mut(&conversation)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(Vec::new()));
        Self::pass(&self.history_gate).await;
        response
    }

    async fn send_message(&self, _conversation: ConversationId, _body: &str) -> Result<Message> {
        self.record("send_message");
        Self::pass(&self.send_gate).await;
        self.sends
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(server_error(500, "no scripted send")))
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.record("list_conversations");
        self.conversations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn create_chat_request(
        &self,
        _counterpart: UserId,
        _initial_message: &str,
    ) -> Result<ChatRequest> {
        self.record("create_chat_request");
        self.chat_requests
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(server_error(500, "no scripted chat request")))
    }

    async fn open_message_stream(&self, _conversation: ConversationId) -> Result<FrameStream> {
        self.record("open_message_stream");

        let failing = self.failing_stream_opens.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_stream_opens.store(failing - 1, Ordering::SeqCst);
            return Err(server_error(503, "stream unavailable"));
        }

        let (tx, rx) = mpsc::unbounded();
        self.streams.lock().unwrap().push(tx);
        Ok(rx.boxed())
    }
}
