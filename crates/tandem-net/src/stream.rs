use futures::stream::{self, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tracing::debug;

use crate::error::Result;
use crate::transport::FrameStream;

/// Connect a WebSocket and expose its text frames.
///
/// Ping/pong and binary frames are skipped. The stream ends on a close
/// frame; a socket error is yielded once and then the stream ends.
pub async fn connect_frame_stream(url: &str) -> Result<FrameStream> {
    let (socket, _response) = connect_async(url).await?;
    debug!("Push stream connected");

    let frames = stream::unfold(Some(socket), |state| async move {
        let mut socket = state?;
        loop {
            match socket.next().await? {
                Ok(WsMessage::Text(text)) => return Some((Ok(text.to_string()), Some(socket))),
                Ok(WsMessage::Close(frame)) => {
                    debug!(?frame, "Push stream closed by server");
                    return None;
                }
                Ok(_) => continue,
                Err(e) => return Some((Err(e.into()), None)),
            }
        }
    });

    Ok(frames.boxed())
}
