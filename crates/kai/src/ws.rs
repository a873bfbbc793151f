//! WebSocket plumbing over `tokio-tungstenite`.
//!
//! [`connect`] opens the socket and splits it into a [`WsWriter`] and a
//! [`WsReader`] so the worker can select over both halves.

use anyhow::{Context, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{self, client::IntoClientRequest};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Inbound message, with raw frames already filtered out.
#[derive(Debug)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong,
    /// Close frame; code 1005 when the peer sent none.
    Close { code: u16, reason: String },
}

pub struct WsWriter {
    sink: SplitSink<WsStream, tungstenite::Message>,
}

impl WsWriter {
    pub async fn send_text(&mut self, text: String) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Text(text))
            .await
            .context("WebSocket send failed")
    }

    pub async fn send_pong(&mut self, data: Vec<u8>) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Pong(data))
            .await
            .context("WebSocket pong failed")
    }

    /// Send a close frame and flush.
    pub async fn close(&mut self) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Close(None))
            .await
            .context("WebSocket close failed")
    }
}

pub struct WsReader {
    stream: SplitStream<WsStream>,
}

impl WsReader {
    /// Next message, or `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<Result<WsMessage>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(anyhow::anyhow!("WebSocket read error: {e}"))),
            };
            let message = match message {
                tungstenite::Message::Text(text) => WsMessage::Text(text),
                tungstenite::Message::Binary(data) => WsMessage::Binary(data),
                tungstenite::Message::Ping(data) => WsMessage::Ping(data),
                tungstenite::Message::Pong(_) => WsMessage::Pong,
                tungstenite::Message::Close(frame) => {
                    let (code, reason) = frame
                        .map(|f| (f.code.into(), f.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    WsMessage::Close { code, reason }
                }
                tungstenite::Message::Frame(_) => continue,
            };
            return Some(Ok(message));
        }
    }
}

/// Open a WebSocket to `url` and split it.
pub async fn connect(url: &str) -> Result<(WsWriter, WsReader)> {
    let request = url
        .into_client_request()
        .with_context(|| format!("invalid hub endpoint: {url}"))?;

    let (stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .with_context(|| format!("failed to connect to {url}"))?;

    let (sink, stream) = stream.split();
    Ok((WsWriter { sink }, WsReader { stream }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_endpoint_is_an_error() {
        let err = connect("not a url").await.err().unwrap();
        assert!(format!("{:#}", err).contains("invalid hub endpoint"));
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = connect(&format!("ws://{}", addr)).await;
        assert!(result.is_err());
    }
}
