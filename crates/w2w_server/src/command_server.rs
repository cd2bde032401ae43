//! TCP acceptor for the command protocol: one task per connection, one
//! request in flight per connection, responses written in request order.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use w2w_client::{Connection, Request, Response, TransportError};

use crate::router::Router;

#[derive(Debug)]
pub struct CommandServer {
    listener: TcpListener,
    router: Arc<Router>,
    idle_timeout: Option<Duration>,
}

impl CommandServer {
    pub async fn bind<A: ToSocketAddrs>(addr: A, router: Router) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            router: Arc::new(router),
            idle_timeout: None,
        })
    }

    /// Close connections that send nothing for `limit`. `None` waits forever.
    pub fn with_idle_timeout(mut self, limit: Option<Duration>) -> Self {
        self.idle_timeout = limit;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept forever.
    pub async fn serve(self) -> io::Result<()> {
        self.serve_until(std::future::pending()).await
    }

    /// Accept until `shutdown` resolves. Connections already accepted keep
    /// running until their peers disconnect.
    pub async fn serve_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = %self.local_addr()?, "command server listening");
        tokio::pin!(shutdown);

        loop {
            let (socket, addr) = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("command server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to accept connection");
                        continue;
                    }
                },
            };

            tracing::info!(peer_addr = %addr, "connection accepted");
            let router = Arc::clone(&self.router);
            let idle = self.idle_timeout;
            tokio::spawn(async move {
                handle_connection(socket, addr, router, idle).await;
                tracing::info!(peer_addr = %addr, "connection closed");
            });
        }
    }
}

async fn handle_connection(socket: TcpStream, addr: SocketAddr, router: Arc<Router>, idle: Option<Duration>) {
    let mut conn = Connection::new(socket);

    loop {
        let value = match conn.receive(idle).await {
            Ok(Some(value)) => value,
            Ok(None) => break,
            Err(TransportError::TimedOut) => {
                tracing::info!(peer_addr = %addr, "idle timeout");
                break;
            }
            Err(e) if e.is_decode() => {
                // The rest of the stream can't be trusted; report and hang up.
                tracing::warn!(peer_addr = %addr, error = %e, "undecodable request");
                if let Err(e) = conn.send(&Response::error(e.to_string())).await {
                    tracing::debug!(peer_addr = %addr, error = %e, "could not send error reply");
                }
                break;
            }
            Err(e) => {
                tracing::warn!(peer_addr = %addr, error = %e, "read failed");
                break;
            }
        };

        let response = match serde_json::from_value::<Request>(value) {
            Ok(request) => {
                tracing::debug!(peer_addr = %addr, action = %request.action, "request received");
                dispatch(Arc::clone(&router), request).await
            }
            Err(e) => Response::error(format!("invalid request: {}", e)),
        };

        if let Err(e) = conn.send(&response).await {
            tracing::warn!(peer_addr = %addr, error = %e, "write failed");
            break;
        }
    }
}

/// Collaborators block on file and HTTP I/O, so routing runs on the blocking pool.
async fn dispatch(router: Arc<Router>, request: Request) -> Response {
    let action = request.action.clone();
    match tokio::task::spawn_blocking(move || router.route(&request)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(action = %action, error = %e, "handler panicked");
            Response::error("Internal server error")
        }
    }
}
