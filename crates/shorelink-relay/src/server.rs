//! Transport server: receives results from the remote peer.
//!
//! The remote-facing listener hands result messages to a `ResultSink`;
//! the serving task feeds them to the endpoint's result callback one at a
//! time. A malformed or unknown result never stops the intake.

use std::sync::Arc;

use tokio::sync::{mpsc, Notify, RwLock};
use tokio::task::JoinHandle;

use crate::callbacks::EndpointCallbacks;
use crate::transport::{ResultEnvelope, TransportError};

/// Buffered results awaiting the serving task.
const RESULT_INTAKE_CAPACITY: usize = 256;

/// Handle the remote-facing listener delivers results through.
#[derive(Clone)]
pub struct ResultSink {
    tx: mpsc::Sender<ResultEnvelope>,
}

impl ResultSink {
    /// Deliver a result received from the remote peer.
    pub async fn deliver(&self, envelope: ResultEnvelope) -> Result<(), TransportError> {
        self.tx
            .send(envelope)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

/// Inbound result server.
pub struct RelayServer {
    callbacks: Arc<EndpointCallbacks>,
    sink_tx: mpsc::Sender<ResultEnvelope>,
    intake: Arc<RwLock<Option<mpsc::Receiver<ResultEnvelope>>>>,
    shutdown_signal: Arc<Notify>,
    task: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl RelayServer {
    /// Create a server feeding the given callbacks.
    pub fn new(callbacks: Arc<EndpointCallbacks>) -> Self {
        let (sink_tx, intake_rx) = mpsc::channel(RESULT_INTAKE_CAPACITY);
        Self {
            callbacks,
            sink_tx,
            intake: Arc::new(RwLock::new(Some(intake_rx))),
            shutdown_signal: Arc::new(Notify::new()),
            task: Arc::new(RwLock::new(None)),
        }
    }

    /// Get a sink for delivering results into this server.
    pub fn sink(&self) -> ResultSink {
        ResultSink {
            tx: self.sink_tx.clone(),
        }
    }

    /// Start consuming results.
    ///
    /// The intake is consumed by the serving task; a stopped server does
    /// not restart.
    pub async fn start(&self) {
        let mut intake = self.intake.write().await;
        let mut rx = match intake.take() {
            Some(rx) => rx,
            None => {
                tracing::warn!("relay server already started");
                return;
            }
        };
        drop(intake);

        let callbacks = self.callbacks.clone();
        let shutdown_signal = self.shutdown_signal.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_signal.notified() => break,
                    received = rx.recv() => match received {
                        Some(envelope) => callbacks.on_result(envelope).await,
                        None => break,
                    },
                }
            }
            tracing::debug!("relay server intake closed");
        });

        let mut task = self.task.write().await;
        *task = Some(handle);
    }

    /// Stop consuming results.
    pub async fn stop(&self) {
        self.shutdown_signal.notify_one();
        let mut task = self.task.write().await;
        if let Some(handle) = task.take() {
            drop(task);
            handle.await.ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RelayStore;
    use shorelink_core::command::{CommandSpec, RemoteCommand};
    use shorelink_core::eventbus::EventBus;
    use std::time::Duration;

    fn make_server() -> (RelayServer, RelayStore) {
        let store = RelayStore::new(8);
        let callbacks = Arc::new(EndpointCallbacks::new(
            store.clone(),
            EventBus::new(),
            "xs1".to_string(),
        ));
        (RelayServer::new(callbacks), store)
    }

    #[tokio::test]
    async fn test_delivered_result_completes_pending() {
        let (server, store) = make_server();

        let command = RemoteCommand::from_spec(CommandSpec::for_resource("r1", "ping"));
        let id = command.id.clone();
        store.enqueue(command).await.unwrap();
        store.acknowledge(&id).await;

        server.start().await;
        server
            .sink()
            .deliver(ResultEnvelope::new(id, serde_json::json!({"ok": true})))
            .await
            .unwrap();

        for _ in 0..100 {
            if store.pending_len().await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(store.pending_len().await, 0);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_unknown_result_keeps_server_running() {
        let (server, store) = make_server();
        server.start().await;

        let sink = server.sink();
        sink.deliver(ResultEnvelope::new("no-such-id", serde_json::json!(null)))
            .await
            .unwrap();

        // intake is still alive for a legitimate result afterwards
        let command = RemoteCommand::from_spec(CommandSpec::for_resource("r1", "ping"));
        let id = command.id.clone();
        store.enqueue(command).await.unwrap();
        store.acknowledge(&id).await;
        sink.deliver(ResultEnvelope::new(id, serde_json::json!(0)))
            .await
            .unwrap();

        for _ in 0..100 {
            if store.pending_len().await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(store.pending_len().await, 0);

        server.stop().await;
    }
}
