//! Relay state: the outbound queue and the pending-command table.
//!
//! Both structures, together with the current link status, live behind one
//! lock per endpoint instance. Telemetry handling, transmission acks,
//! result receipts and the public queue operations all mutate state through
//! this store, so a command is never observable in the queue and the
//! pending table at the same time.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::RwLock;

use shorelink_core::command::{CommandId, CommandStatus, RemoteCommand};
use shorelink_core::event::TelemetryStatus;

/// Outcome of a transmission acknowledgement.
#[derive(Debug)]
pub enum AckOutcome {
    /// The command moved from the outbound queue to the pending table
    Acknowledged {
        /// Commands still waiting to be transmitted
        queue_size: usize,
    },
    /// The id is already pending; the transport sent a duplicate ack
    AlreadyPending,
    /// The id is in neither the queue nor the pending table
    Unknown,
}

/// Outcome of a result receipt.
#[derive(Debug)]
pub enum CompleteOutcome {
    /// The command left the pending table with its result attached
    Completed(RemoteCommand),
    /// No pending command carries this id
    Unknown,
}

/// Store error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("outbound queue is full (capacity {0})")]
    QueueFull(usize),
}

/// State guarded by the per-endpoint lock.
struct StateInner {
    /// FIFO queue of commands not yet transmitted
    queue: VecDeque<RemoteCommand>,
    /// Commands acknowledged by the transport, awaiting results
    pending: HashMap<CommandId, RemoteCommand>,
    /// Current link status, as last reported by telemetry
    link: TelemetryStatus,
    /// Outbound queue capacity
    capacity: usize,
}

/// Shared handle to the relay state.
#[derive(Clone)]
pub struct RelayStore {
    inner: Arc<RwLock<StateInner>>,
}

impl RelayStore {
    /// Create a store with the given outbound queue capacity.
    ///
    /// The link starts out unavailable until telemetry reports otherwise.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StateInner {
                queue: VecDeque::new(),
                pending: HashMap::new(),
                link: TelemetryStatus::Unavailable,
                capacity,
            })),
        }
    }

    /// Append a command to the outbound queue.
    ///
    /// Returns the queue size after the append.
    pub async fn enqueue(&self, command: RemoteCommand) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.queue.len() >= inner.capacity {
            return Err(StoreError::QueueFull(inner.capacity));
        }
        inner.queue.push_back(command);
        Ok(inner.queue.len())
    }

    /// Clone the command at the head of the outbound queue.
    ///
    /// The queue itself is untouched; the command only leaves it when the
    /// transport acknowledges the transmission.
    pub async fn front(&self) -> Option<RemoteCommand> {
        let inner = self.inner.read().await;
        inner.queue.front().cloned()
    }

    /// Record a transmission acknowledgement.
    ///
    /// Moves the command from the outbound queue into the pending table in
    /// one step, so the id is never in both and never in neither.
    pub async fn acknowledge(&self, command_id: &str) -> AckOutcome {
        let mut inner = self.inner.write().await;

        let position = inner.queue.iter().position(|c| c.id == command_id);
        match position.and_then(|index| inner.queue.remove(index)) {
            Some(mut command) => {
                command.status = CommandStatus::Pending;
                inner.pending.insert(command.id.clone(), command);
                AckOutcome::Acknowledged {
                    queue_size: inner.queue.len(),
                }
            }
            None if inner.pending.contains_key(command_id) => AckOutcome::AlreadyPending,
            None => AckOutcome::Unknown,
        }
    }

    /// Record a result receipt.
    ///
    /// Removes the command from the pending table, stamps the completion
    /// time and attaches the result.
    pub async fn complete(&self, command_id: &str, result: serde_json::Value) -> CompleteOutcome {
        let mut inner = self.inner.write().await;
        match inner.pending.remove(command_id) {
            Some(mut command) => {
                command.complete(result);
                CompleteOutcome::Completed(command)
            }
            None => CompleteOutcome::Unknown,
        }
    }

    /// Snapshot the outbound queue, filtered by resource id.
    ///
    /// The empty string matches everything. Enqueue order is preserved.
    pub async fn queue_snapshot(&self, resource_id: &str) -> Vec<RemoteCommand> {
        let inner = self.inner.read().await;
        inner
            .queue
            .iter()
            .filter(|c| c.matches_resource(resource_id))
            .cloned()
            .collect()
    }

    /// Remove matching commands from the outbound queue.
    ///
    /// Permitted only while the link is unavailable; with the link up the
    /// transmitter owns the queue head and nothing is removed. Matching ids
    /// are also dropped from the pending table, which should not normally
    /// hold them.
    ///
    /// Returns the removed commands and the queue size after removal.
    pub async fn clear_queue(&self, resource_id: &str) -> (Vec<RemoteCommand>, usize) {
        let mut inner = self.inner.write().await;
        if inner.link.is_available() {
            let queue_size = inner.queue.len();
            return (Vec::new(), queue_size);
        }

        let mut removed = Vec::new();
        let mut kept = VecDeque::with_capacity(inner.queue.len());
        for command in inner.queue.drain(..) {
            if command.matches_resource(resource_id) {
                removed.push(command);
            } else {
                kept.push_back(command);
            }
        }
        inner.queue = kept;

        for command in &removed {
            inner.pending.remove(&command.id);
        }

        let queue_size = inner.queue.len();
        (removed, queue_size)
    }

    /// Remove at most one command from the outbound queue by id.
    ///
    /// Permitted only while the link is unavailable. Returns the popped
    /// command and the queue size after removal.
    pub async fn pop_queue(&self, command_id: &str) -> Option<(RemoteCommand, usize)> {
        let mut inner = self.inner.write().await;
        if inner.link.is_available() {
            return None;
        }

        let index = inner.queue.iter().position(|c| c.id == command_id)?;
        let command = inner.queue.remove(index)?;
        inner.pending.remove(&command.id);
        let queue_size = inner.queue.len();
        Some((command, queue_size))
    }

    /// Snapshot the pending table, filtered by resource id.
    pub async fn pending_snapshot(&self, resource_id: &str) -> Vec<RemoteCommand> {
        let inner = self.inner.read().await;
        inner
            .pending
            .values()
            .filter(|c| c.matches_resource(resource_id))
            .cloned()
            .collect()
    }

    /// Remove and return matching commands from the pending table.
    ///
    /// Administrative override for stuck commands; not restricted by link
    /// state.
    pub async fn clear_pending(&self, resource_id: &str) -> Vec<RemoteCommand> {
        let mut inner = self.inner.write().await;
        let ids: Vec<CommandId> = inner
            .pending
            .values()
            .filter(|c| c.matches_resource(resource_id))
            .map(|c| c.id.clone())
            .collect();

        ids.iter()
            .filter_map(|id| inner.pending.remove(id))
            .collect()
    }

    /// Number of commands waiting to be transmitted.
    pub async fn queue_len(&self) -> usize {
        self.inner.read().await.queue.len()
    }

    /// Number of commands awaiting results.
    pub async fn pending_len(&self) -> usize {
        self.inner.read().await.pending.len()
    }

    /// Current link status.
    pub async fn link_status(&self) -> TelemetryStatus {
        self.inner.read().await.link
    }

    /// Record a link status change.
    pub async fn set_link_status(&self, status: TelemetryStatus) {
        self.inner.write().await.link = status;
    }
}
