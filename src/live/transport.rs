//! Socket transport behind the live client.
//!
//! A `Connector` opens one socket and hands back a pair of channels: text
//! frames out, frames in. The client never sees tungstenite types.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, warn};
use url::Url;

use super::LiveError;

/// Inbound frame as seen by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// The socket is gone; no more frames follow
    Closed { reason: Option<String> },
}

pub struct SocketChannel {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn open(&self, url: &Url) -> Result<SocketChannel, LiveError>;
}

/// WebSocket connector over tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn open(&self, url: &Url) -> Result<SocketChannel, LiveError> {
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| LiveError::Connect(e.to_string()))?;
        let (mut sink, mut source) = stream.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<Frame>();

        // Writer: ends (and closes the socket) once the client drops its sender
        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if let Err(e) = sink.send(WsMessage::Text(text.into())).await {
                    warn!("Live socket write failed: {}", e);
                    break;
                }
            }
            if let Err(e) = sink.close().await {
                debug!("Live socket close: {}", e);
            }
        });

        // Reader
        tokio::spawn(async move {
            let mut reason = None;
            while let Some(message) = source.next().await {
                let frame = match message {
                    Ok(WsMessage::Text(text)) => Frame::Text(text.as_str().to_owned()),
                    Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => Frame::Text(text),
                        Err(_) => {
                            warn!("Dropping non-UTF-8 binary frame");
                            continue;
                        }
                    },
                    Ok(WsMessage::Close(frame)) => {
                        reason = frame.map(|f| format!("{} {}", u16::from(f.code), f.reason.as_str()));
                        break;
                    }
                    Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_)) => continue,
                    Err(e) => {
                        reason = Some(e.to_string());
                        break;
                    }
                };
                if in_tx.send(frame).is_err() {
                    // Client went away
                    return;
                }
            }
            let _ = in_tx.send(Frame::Closed { reason });
        });

        Ok(SocketChannel {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}
