//! Transport client: drives the outbound queue toward the remote peer.
//!
//! The client owns a transmit loop that repeatedly offers the head of the
//! outbound queue to the transport. Only a confirmed transmission fires
//! the acknowledgement path; a failed attempt leaves the command at the
//! head of the queue, so it is retried on the next tick and survives link
//! outages untouched.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::callbacks::EndpointCallbacks;
use crate::store::RelayStore;
use crate::transport::CommandTransport;

/// Outbound transport client.
#[derive(Clone)]
pub struct RelayClient {
    transport: Arc<dyn CommandTransport>,
    store: RelayStore,
    callbacks: Arc<EndpointCallbacks>,
    poll_interval: Duration,
    running: Arc<RwLock<bool>>,
    task: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl RelayClient {
    /// Create a client over the given transport.
    pub fn new(
        transport: Arc<dyn CommandTransport>,
        store: RelayStore,
        callbacks: Arc<EndpointCallbacks>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            store,
            callbacks,
            poll_interval,
            running: Arc::new(RwLock::new(false)),
            task: Arc::new(RwLock::new(None)),
        }
    }

    /// Start transmitting toward the remote peer.
    ///
    /// Idempotent: starting an already-running client is a no-op reconnect.
    pub async fn start(&self, host: &str, port: u16) {
        let mut running = self.running.write().await;
        if *running {
            tracing::debug!("relay client already transmitting to {}:{}", host, port);
            return;
        }
        *running = true;
        drop(running);

        tracing::info!("relay client connecting to {}:{}", host, port);

        let transport = self.transport.clone();
        let store = self.store.clone();
        let callbacks = self.callbacks.clone();
        let running_flag = self.running.clone();
        let poll_interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);

            loop {
                {
                    let r = running_flag.read().await;
                    if !*r {
                        break;
                    }
                }

                interval.tick().await;

                if let Some(command) = store.front().await {
                    match transport.transmit(&command).await {
                        Ok(()) => callbacks.on_ack(&command.id).await,
                        Err(err) => {
                            tracing::debug!("transmit of command {} deferred: {}", command.id, err);
                        }
                    }
                }
            }

            tracing::debug!("relay client transmit loop stopped");
        });

        let mut task = self.task.write().await;
        *task = Some(handle);
    }

    /// Stop transmitting.
    ///
    /// Commands still in the outbound queue stay there and resume
    /// transmitting on the next start.
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        if !*running {
            return;
        }
        *running = false;
        drop(running);

        let mut task = self.task.write().await;
        if let Some(handle) = task.take() {
            drop(task);
            handle.await.ok();
        }
        tracing::info!("relay client disconnected");
    }

    /// Check if the transmit loop is running.
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
