//! Acknowledgement and result callbacks invoked by the transport layer.
//!
//! Errors are contained here: a bad ack or result is logged and the
//! transport keeps operating.

use shorelink_core::event::RelayEvent;
use shorelink_core::eventbus::EventBus;

use crate::store::{AckOutcome, CompleteOutcome, RelayStore};
use crate::transport::ResultEnvelope;

/// The endpoint's transport-facing callbacks.
pub struct EndpointCallbacks {
    store: RelayStore,
    bus: EventBus,
    scope: String,
}

impl EndpointCallbacks {
    pub(crate) fn new(store: RelayStore, bus: EventBus, scope: String) -> Self {
        Self { store, bus, scope }
    }

    /// Transmission acknowledged by the remote transport.
    ///
    /// Retains the command as pending and reports the outbound queue size.
    /// A duplicate ack is a transport contract violation; it is logged and
    /// changes nothing.
    pub async fn on_ack(&self, command_id: &str) {
        tracing::debug!("transmission ack for command {}", command_id);
        match self.store.acknowledge(command_id).await {
            AckOutcome::Acknowledged { queue_size } => {
                self.bus.publish(
                    RelayEvent::CommandTransmitted { queue_size },
                    self.scope.clone(),
                );
            }
            AckOutcome::AlreadyPending => {
                tracing::warn!("duplicate ack for pending command {}", command_id);
            }
            AckOutcome::Unknown => {
                tracing::warn!("ack for unknown command {}", command_id);
            }
        }
    }

    /// Result received from the remote peer.
    ///
    /// Completes the pending command and publishes the result keyed by the
    /// command's origin. A result for an id that is not pending is dropped
    /// with an error log; nothing is published and nothing is raised.
    pub async fn on_result(&self, envelope: ResultEnvelope) {
        tracing::debug!("result received for command {}", envelope.command_id);
        match self
            .store
            .complete(&envelope.command_id, envelope.result)
            .await
        {
            CompleteOutcome::Completed(command) => match command.origin(&self.scope) {
                Ok(origin) => {
                    self.bus
                        .publish(RelayEvent::RemoteCommandResult { command }, origin);
                }
                Err(err) => {
                    tracing::warn!("result event for command {} suppressed: {}", command.id, err);
                }
            },
            CompleteOutcome::Unknown => {
                tracing::error!(
                    "result for unknown command {} dropped",
                    envelope.command_id
                );
            }
        }
    }
}
