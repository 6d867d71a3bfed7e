/// Application name
pub const APP_NAME: &str = "Tandem";

/// Default REST API base URL (local development)
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Default HTTP request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Stream reconnect backoff defaults
pub const DEFAULT_STREAM_RETRY_BASE_MS: u64 = 500;
pub const DEFAULT_STREAM_RETRY_MAX_MS: u64 = 30_000;
pub const DEFAULT_STREAM_MAX_RETRIES: u32 = 8;

/// Route prefixes handed to the presentation layer
pub const ROUTE_CHATS: &str = "/chats";
pub const ROUTE_CHAT_REQUESTS: &str = "/chat-requests";
