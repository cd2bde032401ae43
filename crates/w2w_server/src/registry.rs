//! Live chat peers, owned by one chat server instance.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Outbound lines queued per peer before it counts as stalled and is dropped.
pub const PEER_QUEUE_DEPTH: usize = 256;

pub type PeerId = u64;

/// Lines are shared between every recipient of one broadcast.
pub type Outbound = mpsc::Sender<Arc<str>>;

#[derive(Debug)]
struct Peer {
    id: PeerId,
    addr: SocketAddr,
    tx: Outbound,
}

/// Ordered set of registered peers.
///
/// Each peer appears once. `remove` is idempotent and tells the caller whether
/// it was the one that took the peer out, so the reader task and a failing
/// broadcast can both try without double-counting.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: Mutex<Vec<Peer>>,
    next_id: AtomicU64,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn peers(&self) -> MutexGuard<'_, Vec<Peer>> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, addr: SocketAddr, tx: Outbound) -> PeerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut peers = self.peers();
        peers.push(Peer { id, addr, tx });
        tracing::debug!(peer = id, peer_addr = %addr, peers = peers.len(), "peer registered");
        id
    }

    /// Drop `id` from the registry. Returns false if it was already gone.
    pub fn remove(&self, id: PeerId) -> bool {
        let mut peers = self.peers();
        match peers.iter().position(|p| p.id == id) {
            Some(pos) => {
                let peer = peers.remove(pos);
                tracing::debug!(peer = id, peer_addr = %peer.addr, peers = peers.len(), "peer removed");
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.peers().iter().any(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.peers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers().is_empty()
    }

    /// Queue `line` for every peer except `from`. Returns how many peers got it.
    ///
    /// Works on a snapshot taken under the lock, so nothing awaits while the
    /// lock is held. A peer whose queue is closed or full is evicted; the rest
    /// still receive the line.
    pub fn broadcast(&self, from: PeerId, line: &str) -> usize {
        let targets: Vec<(PeerId, Outbound)> = self
            .peers()
            .iter()
            .filter(|p| p.id != from)
            .map(|p| (p.id, p.tx.clone()))
            .collect();

        let line: Arc<str> = Arc::from(line);
        let mut delivered = 0;
        for (id, tx) in targets {
            match tx.try_send(Arc::clone(&line)) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    if self.remove(id) {
                        tracing::warn!(peer = id, error = %e, "dropping unreachable peer");
                    }
                }
            }
        }
        delivered
    }

    /// Remove everyone. Closing the queues ends each peer's writer.
    pub fn clear(&self) -> usize {
        let drained: Vec<Peer> = self.peers().drain(..).collect();
        drained.len()
    }
}
