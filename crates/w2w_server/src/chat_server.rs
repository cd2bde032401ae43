//! Broadcast chat server: every line a peer sends is relayed verbatim to all
//! other connected peers. No rooms, no history.

use futures_util::SinkExt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedWrite, LinesCodec};
use w2w_client::transport::text_codec;
use w2w_client::{Connection, TransportError};

use crate::registry::{PeerId, PeerRegistry, PEER_QUEUE_DEPTH};

/// How long a departing peer's queued lines get to flush before the socket is dropped.
const WRITER_DRAIN: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct ChatServer {
    listener: TcpListener,
    registry: Arc<PeerRegistry>,
    idle_timeout: Option<Duration>,
}

impl ChatServer {
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            registry: Arc::new(PeerRegistry::new()),
            idle_timeout: None,
        })
    }

    /// Disconnect peers that send nothing for `limit`. Off by default: a
    /// reader who never posts is a normal chat participant.
    pub fn with_idle_timeout(mut self, limit: Option<Duration>) -> Self {
        self.idle_timeout = limit;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the live peer set, e.g. for monitoring.
    pub fn registry(&self) -> Arc<PeerRegistry> {
        Arc::clone(&self.registry)
    }

    pub async fn serve(self) -> io::Result<()> {
        self.serve_until(std::future::pending()).await
    }

    /// Accept until `shutdown` resolves, then clear the registry, which
    /// disconnects every peer.
    pub async fn serve_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = %self.local_addr()?, "chat server listening");
        tokio::pin!(shutdown);

        loop {
            let (socket, addr) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to accept chat connection");
                        continue;
                    }
                },
            };

            let (tx, rx) = mpsc::channel(PEER_QUEUE_DEPTH);
            let id = self.registry.register(addr, tx);
            tracing::info!(peer = id, peer_addr = %addr, peers = self.registry.len(), "chat peer joined");

            let registry = Arc::clone(&self.registry);
            let idle = self.idle_timeout;
            tokio::spawn(async move {
                run_peer(socket, addr, id, rx, &registry, idle).await;
            });
        }

        let dropped = self.registry.clear();
        tracing::info!(peers = dropped, "chat server shut down");
        Ok(())
    }
}

/// Relay loop for one peer. Returns when the peer disconnects, goes idle,
/// sends a line over the length limit, or its outbound side dies (write
/// failure or eviction). Lines that are not valid UTF-8 are skipped and the
/// peer stays connected.
async fn run_peer(
    socket: TcpStream,
    addr: SocketAddr,
    id: PeerId,
    mut outbound: mpsc::Receiver<Arc<str>>,
    registry: &PeerRegistry,
    idle: Option<Duration>,
) {
    let (read_half, write_half) = socket.into_split();
    let mut writer = FramedWrite::new(write_half, text_codec());

    let mut writer_task = tokio::spawn(async move {
        while let Some(line) = outbound.recv().await {
            if let Err(e) = writer.send(line).await {
                tracing::debug!(peer = id, error = %e, "chat write failed");
                return;
            }
        }
    });

    let mut reader: Connection<OwnedReadHalf, LinesCodec> = Connection::with_codec(read_half, text_codec());
    let mut writer_done = false;

    loop {
        tokio::select! {
            received = reader.receive(idle) => match received {
                Ok(Some(line)) => {
                    if line.is_empty() {
                        continue;
                    }
                    let delivered = registry.broadcast(id, &line);
                    tracing::debug!(peer = id, delivered, "line relayed");
                }
                Ok(None) => break,
                Err(TransportError::TimedOut) => {
                    tracing::info!(peer = id, "chat peer idle, disconnecting");
                    break;
                }
                // The codec has already consumed the offending line.
                Err(TransportError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
                    tracing::warn!(peer = id, error = %e, "dropping non-UTF-8 chat line");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(peer = id, error = %e, "chat read failed");
                    break;
                }
            },
            _ = &mut writer_task => {
                writer_done = true;
                break;
            }
        }
    }

    // Deregistering drops the last sender, so the writer drains and exits.
    if registry.remove(id) {
        tracing::info!(peer = id, peer_addr = %addr, peers = registry.len(), "chat peer left");
    }
    if !writer_done && tokio::time::timeout(WRITER_DRAIN, &mut writer_task).await.is_err() {
        writer_task.abort();
    }
}
