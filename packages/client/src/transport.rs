//! WebSocket transport: connect, send, receive, close.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, protocol::Message},
};

use crate::error::ClientError;

/// Query parameter used to resume a server-side session
pub const SESSION_QUERY_PARAM: &str = "sessionId";

/// A data frame received from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Bidirectional message channel to the chat server.
///
/// `receive` returns `Ok(None)` once the channel is closed.
#[async_trait]
pub trait Channel: Send {
    async fn send_text(&mut self, text: String) -> Result<(), ClientError>;

    async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<(), ClientError>;

    async fn receive(&mut self) -> Result<Option<Frame>, ClientError>;

    async fn close(&mut self) -> Result<(), ClientError>;
}

/// Factory for fresh channels; each call is a new transport instance.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, session_id: Option<&str>) -> Result<Box<dyn Channel>, ClientError>;
}

/// Build the WebSocket URL, appending `sessionId` when resuming.
pub fn build_connect_url(endpoint: &str, session_id: Option<&str>) -> Result<Url, ClientError> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| ClientError::ConnectionError(format!("invalid URL '{}': {}", endpoint, e)))?;

    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(ClientError::ConnectionError(format!(
                "unsupported scheme '{}' in '{}'",
                other, endpoint
            )));
        }
    }

    if let Some(session_id) = session_id {
        url.query_pairs_mut()
            .append_pair(SESSION_QUERY_PARAM, session_id);
    }

    Ok(url)
}

/// Open a WebSocket channel, bounded by `timeout`.
pub async fn connect(
    endpoint: &str,
    session_id: Option<&str>,
    timeout: Duration,
) -> Result<WsChannel, ClientError> {
    let url = build_connect_url(endpoint, session_id)?;

    match session_id {
        Some(id) => tracing::info!("Resuming session '{}' at {}", id, url),
        None => tracing::info!("Opening new session at {}", url),
    }

    let (stream, response) = match tokio::time::timeout(timeout, connect_async(url.as_str())).await
    {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => return Err(ClientError::ConnectionError(e.to_string())),
        Err(_) => {
            return Err(ClientError::ConnectionError(format!(
                "no WebSocket upgrade from {} within {:?}",
                url, timeout
            )));
        }
    };

    tracing::debug!("WebSocket upgrade status: {}", response.status());
    tracing::info!("Connected to chat server!");

    Ok(WsChannel::new(stream))
}

/// `Channel` over a tokio-tungstenite stream
pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl WsChannel {
    fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self {
            stream,
            closed: false,
        }
    }

    async fn send_message(&mut self, message: Message) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::ChannelClosed);
        }
        self.stream.send(message).await.map_err(|e| {
            self.closed = true;
            ClientError::ConnectionError(e.to_string())
        })
    }
}

#[async_trait]
impl Channel for WsChannel {
    async fn send_text(&mut self, text: String) -> Result<(), ClientError> {
        self.send_message(Message::Text(text.into())).await
    }

    async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<(), ClientError> {
        self.send_message(Message::Binary(bytes.into())).await
    }

    async fn receive(&mut self) -> Result<Option<Frame>, ClientError> {
        if self.closed {
            return Ok(None);
        }

        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => return Ok(Some(Frame::Text(text.as_str().to_owned()))),
                Ok(Message::Binary(data)) => return Ok(Some(Frame::Binary(data.to_vec()))),
                Ok(Message::Close(frame)) => {
                    tracing::info!("Server closed the connection: {:?}", frame);
                    self.closed = true;
                    return Ok(None);
                }
                // ping/pong are answered by tungstenite
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    self.closed = true;
                    return Ok(None);
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    self.closed = true;
                    return Err(ClientError::ConnectionError(e.to_string()));
                }
            }
        }

        self.closed = true;
        Ok(None)
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match self.stream.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(ClientError::ConnectionError(e.to_string())),
        }
    }
}

/// `Connector` producing `WsChannel`s for one endpoint
#[derive(Debug, Clone)]
pub struct WsConnector {
    endpoint: String,
    timeout: Duration,
}

impl WsConnector {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, session_id: Option<&str>) -> Result<Box<dyn Channel>, ClientError> {
        let channel = connect(&self.endpoint, session_id, self.timeout).await?;
        Ok(Box::new(channel))
    }
}
