//! Link monitor: reacts to telemetry status changes.
//!
//! Telemetry decides when the transmitter runs. On an available report the
//! monitor records the new link state, connects the transport client to
//! the configured remote address and announces availability; on an
//! unavailable report it disconnects and announces the outage.

use std::sync::Arc;

use tokio::sync::RwLock;

use shorelink_core::event::{RelayEvent, TelemetryStatus};
use shorelink_core::eventbus::EventBus;

use crate::client::RelayClient;
use crate::store::RelayStore;

/// Remote peer address, adjustable at runtime.
#[derive(Debug, Clone)]
pub struct RemoteAddr {
    /// Remote peer host
    pub host: String,
    /// Remote peer port
    pub port: u16,
}

/// Telemetry-driven link supervisor.
#[derive(Clone)]
pub struct LinkMonitor {
    store: RelayStore,
    client: RelayClient,
    bus: EventBus,
    scope: String,
    remote: Arc<RwLock<RemoteAddr>>,
}

impl LinkMonitor {
    pub(crate) fn new(
        store: RelayStore,
        client: RelayClient,
        bus: EventBus,
        scope: String,
        remote: Arc<RwLock<RemoteAddr>>,
    ) -> Self {
        Self {
            store,
            client,
            bus,
            scope,
            remote,
        }
    }

    /// Apply a telemetry status report.
    ///
    /// Repeated identical reports are permitted; re-applying an available
    /// status simply reconnects.
    pub async fn apply(&self, status: TelemetryStatus) {
        self.store.set_link_status(status).await;
        match status {
            TelemetryStatus::Available => self.on_link_up().await,
            TelemetryStatus::Unavailable => self.on_link_down().await,
        }
    }

    async fn on_link_up(&self) {
        let remote = self.remote.read().await.clone();
        tracing::debug!(
            "link available, transmitter connecting to {}:{}",
            remote.host,
            remote.port
        );
        self.client.start(&remote.host, remote.port).await;
        self.bus.publish(
            RelayEvent::LinkAvailability {
                status: TelemetryStatus::Available,
            },
            self.scope.clone(),
        );
    }

    async fn on_link_down(&self) {
        tracing::debug!("link unavailable, stopping transmitter");
        self.client.stop().await;
        self.bus.publish(
            RelayEvent::LinkAvailability {
                status: TelemetryStatus::Unavailable,
            },
            self.scope.clone(),
        );
    }
}
