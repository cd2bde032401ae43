//! TCP clients: one-shot command requests and the long-lived chat connection.

use serde_json::{Map, Value};
use std::io;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::LinesCodec;

use crate::messages::{Request, Response};
use crate::transport::{preview, text_codec, Connection, TransportError};

/// Idle read timeout applied to every command request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Client-side failure talking to either server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not connect to server: {0}")]
    Connect(#[source] io::Error),
    #[error("connection timed out")]
    ConnectTimedOut,
    #[error("request timed out")]
    TimedOut,
    #[error("no data received from server")]
    NoData,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] serde_json::Error),
    #[error("network error: {0}")]
    Transport(#[source] TransportError),
}

impl From<TransportError> for ClientError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::TimedOut => ClientError::TimedOut,
            TransportError::Malformed { preview, .. } => ClientError::InvalidResponse(preview),
            other => ClientError::Transport(other),
        }
    }
}

impl ClientError {
    /// The error envelope a UI shows in place of a server reply.
    pub fn to_response(&self) -> Response {
        Response::error(self.to_string())
    }
}

/// Command-protocol client. Each request opens its own connection, sends one
/// envelope and waits for one reply; nothing is pooled.
#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
    timeout: Duration,
}

impl Client {
    /// `addr` is `host:port`, e.g. `127.0.0.1:5000`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send `{"action": action, "data": data}` and return the reply envelope.
    pub async fn send_request(&self, action: &str, data: Value) -> Result<Response, ClientError> {
        let data = match data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ClientError::InvalidRequest(serde::de::Error::custom(format!(
                    "data must be a JSON object, got {}",
                    other
                ))))
            }
        };
        self.request(&Request::new(action, data)).await
    }

    pub async fn request(&self, request: &Request) -> Result<Response, ClientError> {
        let stream = connect_with_timeout(&self.addr, self.timeout).await?;
        let mut conn = Connection::new(stream);
        conn.send(request).await?;

        let value = conn
            .receive(Some(self.timeout))
            .await?
            .ok_or(ClientError::NoData)?;
        serde_json::from_value::<Response>(value.clone())
            .map_err(|_| ClientError::InvalidResponse(preview(&value.to_string())))
    }
}

async fn connect_with_timeout<A: ToSocketAddrs>(addr: A, limit: Duration) -> Result<TcpStream, ClientError> {
    match tokio::time::timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(ClientError::Connect(e)),
        Err(_) => Err(ClientError::ConnectTimedOut),
    }
}

/// A connection to the chat server. Split it to read and write from separate tasks.
#[derive(Debug)]
pub struct ChatClient {
    sender: ChatSender,
    receiver: ChatReceiver,
}

/// Write side of a chat connection.
#[derive(Debug)]
pub struct ChatSender {
    conn: Connection<OwnedWriteHalf, LinesCodec>,
}

/// Read side of a chat connection.
#[derive(Debug)]
pub struct ChatReceiver {
    conn: Connection<OwnedReadHalf, LinesCodec>,
}

impl ChatClient {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = connect_with_timeout(addr, DEFAULT_TIMEOUT).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            sender: ChatSender {
                conn: Connection::with_codec(write_half, text_codec()),
            },
            receiver: ChatReceiver {
                conn: Connection::with_codec(read_half, text_codec()),
            },
        })
    }

    pub async fn send(&mut self, line: &str) -> Result<(), ClientError> {
        self.sender.send(line).await
    }

    pub async fn recv(&mut self, idle: Option<Duration>) -> Result<Option<String>, ClientError> {
        self.receiver.recv(idle).await
    }

    pub fn split(self) -> (ChatSender, ChatReceiver) {
        (self.sender, self.receiver)
    }
}

impl ChatSender {
    /// Send one line. Embedded newlines would split the message, so they are
    /// flattened to spaces.
    pub async fn send(&mut self, line: &str) -> Result<(), ClientError> {
        let flat = line.replace(['\r', '\n'], " ");
        self.conn.send(flat).await?;
        Ok(())
    }

    /// Half-close; the server sees EOF and deregisters this peer.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.conn.shutdown().await?;
        Ok(())
    }
}

impl ChatReceiver {
    /// Next relayed line, or `None` once the server closes the connection.
    pub async fn recv(&mut self, idle: Option<Duration>) -> Result<Option<String>, ClientError> {
        Ok(self.conn.receive(idle).await?)
    }
}
