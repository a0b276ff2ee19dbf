//! Transport capability contracts.
//!
//! The relay does not implement wire framing; it talks to the remote peer
//! through these seams. An outbound implementation confirms transmission,
//! an inbound one hands over result messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use shorelink_core::command::{CommandId, RemoteCommand};

/// Outbound transport capability.
///
/// `transmit` returns `Ok` only once the remote peer has confirmed receipt
/// at the transport layer; the acknowledgement path fires on that
/// confirmation, never on a local send. Implementations are expected to
/// bound their own I/O with timeouts.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Transmit a command to the remote peer.
    async fn transmit(&self, command: &RemoteCommand) -> Result<(), TransportError>;
}

/// Result message received from the remote peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Id of the command this result belongs to
    pub command_id: CommandId,
    /// Opaque result payload
    pub result: serde_json::Value,
}

impl ResultEnvelope {
    /// Create a result envelope.
    pub fn new(command_id: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            command_id: command_id.into(),
            result,
        }
    }
}

/// Transport error types.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("remote peer unreachable: {0}")]
    Unreachable(String),

    #[error("transmission rejected by remote peer: {0}")]
    Rejected(String),

    #[error("transport channel closed")]
    Closed,
}
