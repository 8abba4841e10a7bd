//! Registry of live client connections

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;
use uuid::Uuid;

/// Identifier assigned to each connection; never reused
pub type ConnId = Uuid;

/// Frames queued for a connection's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(Arc<str>),
    Close,
}

/// Why a send to a peer failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("connection closed")]
    Closed,
    #[error("outbound queue full")]
    Full,
}

/// Sending half of a client connection
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnId,
    outbound: mpsc::Sender<Outbound>,
}

impl ConnectionHandle {
    /// Create a handle plus the receiver its writer task drains
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (outbound, rx) = mpsc::channel(buffer);
        let handle = Self {
            id: Uuid::new_v4(),
            outbound,
        };
        (handle, rx)
    }

    /// Queue a text frame without waiting
    pub fn send(&self, payload: Arc<str>) -> Result<(), SendError> {
        self.push(Outbound::Text(payload))
    }

    /// Ask the writer to close the socket
    pub fn close(&self) -> Result<(), SendError> {
        self.push(Outbound::Close)
    }

    fn push(&self, frame: Outbound) -> Result<(), SendError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

/// Result of one broadcast pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub evicted: usize,
}

/// The set of attached clients
pub struct ConnectionRegistry {
    connections: DashMap<ConnId, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Insert a handle; re-adding a known id keeps the existing entry
    pub fn add(&self, handle: ConnectionHandle) {
        self.connections.entry(handle.id).or_insert(handle);
    }

    /// Remove a handle if present
    pub fn remove(&self, id: &ConnId) -> Option<ConnectionHandle> {
        self.connections.remove(id).map(|(_, h)| h)
    }

    pub fn contains(&self, id: &ConnId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Send `payload` to every connection except `excluding`.
    ///
    /// Peers whose send fails are evicted once the pass is over.
    pub fn broadcast(&self, payload: &Arc<str>, excluding: Option<ConnId>) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();

        for entry in self.connections.iter() {
            if Some(*entry.key()) == excluding {
                continue;
            }
            match entry.value().send(payload.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => failed.push((*entry.key(), e)),
            }
        }

        // Shard locks are released; safe to mutate now
        for (id, reason) in failed {
            if self.connections.remove(&id).is_some() {
                debug!(conn_id = %id, reason = %reason, "Evicted connection after failed send");
                report.evicted += 1;
            }
        }

        report
    }

    /// Ask every connection to close, then forget all of them
    pub fn close_all(&self) -> usize {
        let mut closed = 0;
        for entry in self.connections.iter() {
            if entry.value().close().is_ok() {
                closed += 1;
            }
        }
        self.connections.clear();
        closed
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn text(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    #[test]
    fn test_add_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::new(4);

        registry.add(handle.clone());
        registry.add(handle.clone());

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&handle.id));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::new(4);
        registry.add(handle.clone());

        assert!(registry.remove(&handle.id).is_some());
        assert!(registry.remove(&handle.id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_broadcast_reaches_everyone() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = ConnectionHandle::new(4);
        let (b, mut rx_b) = ConnectionHandle::new(4);
        registry.add(a);
        registry.add(b);

        let report = registry.broadcast(&text("hello"), None);

        assert_eq!(
            report,
            BroadcastReport {
                delivered: 2,
                evicted: 0,
            }
        );
        assert_eq!(assert_ok!(rx_a.try_recv()), Outbound::Text(text("hello")));
        assert_eq!(assert_ok!(rx_b.try_recv()), Outbound::Text(text("hello")));
    }

    #[test]
    fn test_broadcast_excludes_sender() {
        let registry = ConnectionRegistry::new();
        let (sender, mut rx_sender) = ConnectionHandle::new(4);
        let (other, mut rx_other) = ConnectionHandle::new(4);
        let sender_id = sender.id;
        registry.add(sender);
        registry.add(other);

        let report = registry.broadcast(&text("moved"), Some(sender_id));

        assert_eq!(report.delivered, 1);
        assert_err!(rx_sender.try_recv());
        assert_eq!(assert_ok!(rx_other.try_recv()), Outbound::Text(text("moved")));
    }

    #[test]
    fn test_closed_peer_is_evicted() {
        let registry = ConnectionRegistry::new();
        let (gone, rx_gone) = ConnectionHandle::new(4);
        let (alive, mut rx_alive) = ConnectionHandle::new(4);
        let gone_id = gone.id;
        registry.add(gone);
        registry.add(alive);
        drop(rx_gone);

        let report = registry.broadcast(&text("tick"), None);

        assert_eq!(
            report,
            BroadcastReport {
                delivered: 1,
                evicted: 1,
            }
        );
        assert!(!registry.contains(&gone_id));
        assert_ok!(rx_alive.try_recv());

        // Later broadcasts no longer consider the evicted peer
        let report = registry.broadcast(&text("tick"), None);
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 1,
                evicted: 0,
            }
        );
    }

    #[test]
    fn test_full_queue_is_evicted() {
        let registry = ConnectionRegistry::new();
        let (slow, _rx_slow) = ConnectionHandle::new(1);
        let slow_id = slow.id;
        registry.add(slow);

        assert_eq!(registry.broadcast(&text("1"), None).delivered, 1);
        let report = registry.broadcast(&text("2"), None);

        assert_eq!(
            report,
            BroadcastReport {
                delivered: 0,
                evicted: 1,
            }
        );
        assert!(!registry.contains(&slow_id));
    }

    #[test]
    fn test_handle_send_errors() {
        let (handle, rx) = ConnectionHandle::new(1);
        assert_ok!(handle.send(text("a")));
        assert_eq!(handle.send(text("b")), Err(SendError::Full));
        drop(rx);
        assert_eq!(handle.close(), Err(SendError::Closed));
    }

    #[test]
    fn test_close_all_clears_even_on_failure() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = ConnectionHandle::new(4);
        let (b, rx_b) = ConnectionHandle::new(4);
        registry.add(a);
        registry.add(b);
        drop(rx_b);

        let closed = registry.close_all();

        assert_eq!(closed, 1);
        assert!(registry.is_empty());
        assert_eq!(assert_ok!(rx_a.try_recv()), Outbound::Close);
    }

    #[tokio::test]
    async fn test_concurrent_removal_during_broadcast() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut receivers = Vec::new();
        let mut ids = Vec::new();
        for _ in 0..64 {
            let (h, rx) = ConnectionHandle::new(1024);
            ids.push(h.id);
            registry.add(h);
            receivers.push(rx);
        }

        let remover = {
            let registry = registry.clone();
            let ids = ids.clone();
            tokio::spawn(async move {
                for id in ids.iter().step_by(2) {
                    registry.remove(id);
                    tokio::task::yield_now().await;
                }
            })
        };

        for _ in 0..100 {
            registry.broadcast(&text("x"), None);
            tokio::task::yield_now().await;
        }
        remover.await.unwrap();

        assert_eq!(registry.len(), 32);
        for id in ids.iter().step_by(2) {
            assert!(!registry.contains(id));
        }
        let report = registry.broadcast(&text("after"), None);
        assert_eq!(report.delivered, 32);
    }
}
