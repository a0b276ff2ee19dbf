//! In-process loopback transport.
//!
//! Stands in for the remote peer in tests and demos: transmitted commands
//! land on the remote handle, and the handle can be toggled unreachable to
//! simulate the peer going dark mid-queue.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use shorelink_core::command::RemoteCommand;

use crate::transport::{CommandTransport, TransportError};

/// Outbound half of the loopback pair.
pub struct LoopbackTransport {
    reachable: Arc<RwLock<bool>>,
    delivered_tx: mpsc::UnboundedSender<RemoteCommand>,
}

/// Remote-peer half of the loopback pair.
pub struct LoopbackRemote {
    reachable: Arc<RwLock<bool>>,
    delivered_rx: mpsc::UnboundedReceiver<RemoteCommand>,
}

impl LoopbackTransport {
    /// Create a connected transport/remote pair, initially reachable.
    pub fn pair() -> (Arc<LoopbackTransport>, LoopbackRemote) {
        let reachable = Arc::new(RwLock::new(true));
        let (delivered_tx, delivered_rx) = mpsc::unbounded_channel();
        (
            Arc::new(LoopbackTransport {
                reachable: reachable.clone(),
                delivered_tx,
            }),
            LoopbackRemote {
                reachable,
                delivered_rx,
            },
        )
    }
}

#[async_trait]
impl CommandTransport for LoopbackTransport {
    async fn transmit(&self, command: &RemoteCommand) -> Result<(), TransportError> {
        if !*self.reachable.read().await {
            return Err(TransportError::Unreachable("loopback peer offline".into()));
        }
        self.delivered_tx
            .send(command.clone())
            .map_err(|_| TransportError::Closed)
    }
}

impl LoopbackRemote {
    /// Toggle whether transmissions reach this peer.
    pub async fn set_reachable(&self, reachable: bool) {
        *self.reachable.write().await = reachable;
    }

    /// Receive the next command transmitted to this peer.
    pub async fn recv(&mut self) -> Option<RemoteCommand> {
        self.delivered_rx.recv().await
    }

    /// Try to receive a command without blocking.
    pub fn try_recv(&mut self) -> Option<RemoteCommand> {
        self.delivered_rx.try_recv().ok()
    }
}
