use std::sync::RwLock;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use tandem_shared::{
    ChatRequest, ConversationId, ConversationSummary, ListResponse, Message, UserId,
};

use crate::config::TransportConfig;
use crate::error::{ApiError, Result, TransportError};
use crate::stream::connect_frame_stream;
use crate::transport::{FrameStream, Transport};

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateChatRequestBody<'a> {
    recipient_id: UserId,
    initial_message: &'a str,
}

/// REST + WebSocket implementation of [`Transport`].
pub struct HttpTransport {
    config: TransportConfig,
    client: reqwest::Client,
    access_token: RwLock<Option<String>>,
}

impl HttpTransport {
    pub fn new(config: TransportConfig, access_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            config,
            client,
            access_token: RwLock::new(access_token.filter(|t| !t.is_empty())),
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn set_access_token(&self, token: impl Into<String>) {
        let token = token.into();
        let mut guard = self.access_token.write().unwrap_or_else(|e| e.into_inner());
        *guard = (!token.is_empty()).then_some(token);
    }

    pub fn clear_access_token(&self) {
        let mut guard = self.access_token.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    fn token(&self) -> Result<String> {
        self.access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(TransportError::MissingCredentials)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.token()?;
        debug!(path, "GET");
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let token = self.token()?;
        debug!(path, "POST");
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        read_json(resp).await
    }
}

/// Map non-2xx responses to [`ApiError`], otherwise decode the body.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::from_body(status.as_u16(), &body).into());
    }

    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl Transport for HttpTransport {
    fn has_credentials(&self) -> bool {
        self.access_token
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    async fn list_messages(&self, conversation: ConversationId) -> Result<Vec<Message>> {
        let page: ListResponse<Message> = self
            .get_json(&format!("/chats/{conversation}/messages"))
            .await?;
        Ok(page.items)
    }

    async fn send_message(&self, conversation: ConversationId, body: &str) -> Result<Message> {
        self.post_json(
            &format!("/chats/{conversation}/messages"),
            &SendMessageBody { body },
        )
        .await
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let page: ListResponse<ConversationSummary> = self.get_json("/chats").await?;
        Ok(page.items)
    }

    async fn create_chat_request(
        &self,
        counterpart: UserId,
        initial_message: &str,
    ) -> Result<ChatRequest> {
        self.post_json(
            "/chat-requests",
            &CreateChatRequestBody {
                recipient_id: counterpart,
                initial_message,
            },
        )
        .await
    }

    async fn open_message_stream(&self, conversation: ConversationId) -> Result<FrameStream> {
        let token = self.token()?;
        let url = format!(
            "{}/ws/chats/{conversation}?token={token}",
            self.config.stream_base()?
        );
        connect_frame_stream(&url).await
    }
}
