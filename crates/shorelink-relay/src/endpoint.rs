//! Terrestrial relay endpoint.
//!
//! The endpoint bridges a reliable terrestrial network and an
//! intermittently connected remote link. Callers enqueue commands here;
//! the transport client drains the outbound queue whenever telemetry says
//! the link is up, and results are reconciled asynchronously as they
//! arrive, possibly spanning several link outages.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;

use shorelink_core::command::{CommandSpec, RemoteCommand};
use shorelink_core::config::{ConfigError, RelayConfig};
use shorelink_core::event::{RelayEvent, TelemetryStatus};
use shorelink_core::eventbus::EventBus;

use crate::callbacks::EndpointCallbacks;
use crate::client::RelayClient;
use crate::link::{LinkMonitor, RemoteAddr};
use crate::server::{RelayServer, ResultSink};
use crate::store::RelayStore;
use crate::transport::{CommandTransport, ResultEnvelope};

/// Terrestrial command relay endpoint.
///
/// One instance owns one outbound queue, one pending-command table and one
/// link state; multiple independent endpoints can coexist in a process.
pub struct RelayEndpoint {
    scope: String,
    bind_port: u16,
    remote: Arc<RwLock<RemoteAddr>>,
    store: RelayStore,
    bus: EventBus,
    callbacks: Arc<EndpointCallbacks>,
    client: RelayClient,
    server: RelayServer,
    monitor: LinkMonitor,
    shutdown_signal: Arc<Notify>,
    telemetry_task: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl RelayEndpoint {
    /// Create an endpoint over the given bus and transport.
    ///
    /// Fails when the configuration lacks a scope identifier; everything
    /// else has defaults.
    pub fn new(
        config: RelayConfig,
        bus: EventBus,
        transport: Arc<dyn CommandTransport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let store = RelayStore::new(config.queue_capacity);
        let callbacks = Arc::new(EndpointCallbacks::new(
            store.clone(),
            bus.clone(),
            config.scope.clone(),
        ));
        let client = RelayClient::new(
            transport,
            store.clone(),
            callbacks.clone(),
            Duration::from_millis(config.transmit_poll_ms),
        );
        let server = RelayServer::new(callbacks.clone());
        let remote = Arc::new(RwLock::new(RemoteAddr {
            host: config.remote_host.clone(),
            port: config.remote_port,
        }));
        let monitor = LinkMonitor::new(
            store.clone(),
            client.clone(),
            bus.clone(),
            config.scope.clone(),
            remote.clone(),
        );

        Ok(Self {
            scope: config.scope,
            bind_port: config.bind_port,
            remote,
            store,
            bus,
            callbacks,
            client,
            server,
            monitor,
            shutdown_signal: Arc::new(Notify::new()),
            telemetry_task: Arc::new(RwLock::new(None)),
        })
    }

    /// Start the endpoint: result intake plus telemetry subscription.
    ///
    /// The transport client is started and stopped by the link monitor as
    /// telemetry reports arrive on the bus.
    pub async fn start(&self) {
        self.server.start().await;

        let monitor = self.monitor.clone();
        let shutdown_signal = self.shutdown_signal.clone();
        let mut telemetry = self.bus.subscribe_filtered(RelayEvent::is_telemetry);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_signal.notified() => break,
                    received = telemetry.recv() => match received {
                        Some((RelayEvent::TelemetryUpdate { status }, _meta)) => {
                            monitor.apply(status).await;
                        }
                        Some(_) => {}
                        None => break,
                    },
                }
            }
            tracing::debug!("telemetry subscription closed");
        });
        *self.telemetry_task.write().await = Some(handle);

        tracing::info!("relay endpoint {} started", self.scope);
    }

    /// Stop the endpoint, releasing the transport client and server.
    pub async fn shutdown(&self) {
        self.shutdown_signal.notify_one();
        let mut task = self.telemetry_task.write().await;
        if let Some(handle) = task.take() {
            drop(task);
            handle.await.ok();
        }

        self.client.stop().await;
        self.server.stop().await;
        tracing::info!("relay endpoint {} stopped", self.scope);
    }

    /// Enqueue a command for remote processing.
    ///
    /// With `link` set the command is accepted only while the link is
    /// available; otherwise it is dropped, not deferred. A malformed draft
    /// is rejected the same way. On success the draft is stamped with a
    /// fresh id and queue time, appended to the outbound queue, and
    /// returned.
    pub async fn enqueue_command(&self, spec: CommandSpec, link: bool) -> Option<RemoteCommand> {
        if link && !self.store.link_status().await.is_available() {
            tracing::debug!(
                "link-gated command {} dropped while link is down",
                spec.command
            );
            return None;
        }

        if !spec.is_well_formed() {
            tracing::warn!("rejected malformed command draft");
            return None;
        }

        let command = RemoteCommand::from_spec(spec);
        match self.store.enqueue(command.clone()).await {
            Ok(queue_size) => {
                self.bus
                    .publish(RelayEvent::QueueModified { queue_size }, self.scope.clone());
                Some(command)
            }
            Err(err) => {
                tracing::warn!("command {} rejected: {}", command.id, err);
                None
            }
        }
    }

    /// Retrieve the outbound queue, filtered by resource id.
    ///
    /// The empty string matches everything. Enqueue order is preserved.
    pub async fn get_queue(&self, resource_id: &str) -> Vec<RemoteCommand> {
        self.store.queue_snapshot(resource_id).await
    }

    /// Clear the outbound queue by resource id.
    ///
    /// Only effective while the link is unavailable; with the link up the
    /// transmitter owns the queue and this is a no-op returning an empty
    /// list. Returns the removed commands.
    pub async fn clear_queue(&self, resource_id: &str) -> Vec<RemoteCommand> {
        let (removed, queue_size) = self.store.clear_queue(resource_id).await;
        if !removed.is_empty() {
            self.bus
                .publish(RelayEvent::QueueModified { queue_size }, self.scope.clone());
        }
        removed
    }

    /// Pop one command from the outbound queue by id.
    ///
    /// Only effective while the link is unavailable. Returns the popped
    /// command, or `None` when the id is not queued or the link is up.
    pub async fn pop_queue(&self, command_id: &str) -> Option<RemoteCommand> {
        match self.store.pop_queue(command_id).await {
            Some((command, queue_size)) => {
                self.bus
                    .publish(RelayEvent::QueueModified { queue_size }, self.scope.clone());
                Some(command)
            }
            None => None,
        }
    }

    /// Retrieve pending commands by resource id.
    pub async fn get_pending(&self, resource_id: &str) -> Vec<RemoteCommand> {
        self.store.pending_snapshot(resource_id).await
    }

    /// Remove and return pending commands by resource id.
    ///
    /// Administrative override for stuck commands; works in any link
    /// state. The remote side is not notified.
    pub async fn clear_pending(&self, resource_id: &str) -> Vec<RemoteCommand> {
        self.store.clear_pending(resource_id).await
    }

    /// Transmission acknowledgement entry point for the transport layer.
    pub async fn handle_ack(&self, command_id: &str) {
        self.callbacks.on_ack(command_id).await;
    }

    /// Result receipt entry point for the transport layer.
    pub async fn handle_result(&self, envelope: ResultEnvelope) {
        self.callbacks.on_result(envelope).await;
    }

    /// Get a sink the remote-facing listener delivers results through.
    pub fn result_sink(&self) -> ResultSink {
        self.server.sink()
    }

    /// The endpoint's exchange scope identifier.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Local port the transport server listens on.
    pub fn server_port(&self) -> u16 {
        self.bind_port
    }

    /// Remote peer host the transport client connects to.
    pub async fn remote_host(&self) -> String {
        self.remote.read().await.host.clone()
    }

    /// Remote peer port the transport client connects to.
    pub async fn remote_port(&self) -> u16 {
        self.remote.read().await.port
    }

    /// Set the remote peer host used on the next connect.
    pub async fn set_remote_host(&self, host: impl Into<String>) {
        self.remote.write().await.host = host.into();
    }

    /// Set the remote peer port used on the next connect.
    pub async fn set_remote_port(&self, port: u16) {
        self.remote.write().await.port = port;
    }

    /// Current link status.
    pub async fn link_status(&self) -> TelemetryStatus {
        self.store.link_status().await
    }
}
