//! Transport adapter: authenticated REST calls and per-conversation push
//! streams, plus the error normalization applied at that boundary.

pub mod config;
pub mod error;
pub mod http;
pub mod retry;
pub mod stream;
pub mod transport;

pub use config::TransportConfig;
pub use error::{ApiError, Result, TransportError};
pub use http::HttpTransport;
pub use retry::ReconnectPolicy;
pub use stream::connect_frame_stream;
pub use transport::{FrameStream, Transport};
