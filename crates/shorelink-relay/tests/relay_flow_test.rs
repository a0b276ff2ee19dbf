//! End-to-end relay flow tests.
//!
//! Wires a started endpoint to a loopback remote peer and drives the link
//! with telemetry events on the bus.

use std::time::Duration;

use shorelink_core::command::{CommandSpec, CommandStatus};
use shorelink_core::config::RelayConfig;
use shorelink_core::event::{RelayEvent, TelemetryStatus};
use shorelink_core::eventbus::EventBus;
use shorelink_relay::endpoint::RelayEndpoint;
use shorelink_relay::loopback::{LoopbackRemote, LoopbackTransport};
use shorelink_relay::transport::ResultEnvelope;

async fn started_endpoint(scope: &str) -> (RelayEndpoint, EventBus, LoopbackRemote) {
    let bus = EventBus::new();
    let (transport, remote) = LoopbackTransport::pair();
    let config = RelayConfig::new(scope).with_transmit_poll_ms(10);
    let endpoint = RelayEndpoint::new(config, bus.clone(), transport).unwrap();
    endpoint.start().await;
    (endpoint, bus, remote)
}

/// Publish a telemetry report and wait for the endpoint to announce the
/// resulting link availability.
async fn flip_link(bus: &EventBus, status: TelemetryStatus) {
    let mut announced = bus.subscribe_filtered(RelayEvent::is_link_event);
    bus.publish(RelayEvent::TelemetryUpdate { status }, "platform");

    loop {
        let (event, _) = tokio::time::timeout(Duration::from_secs(2), announced.recv())
            .await
            .expect("timed out waiting for link announcement")
            .expect("event bus closed");
        if let RelayEvent::LinkAvailability { status: seen } = event {
            if seen == status {
                return;
            }
        }
    }
}

#[tokio::test]
async fn test_transmit_ack_and_result_flow() {
    let (endpoint, bus, mut remote) = started_endpoint("xs1").await;

    let command = endpoint
        .enqueue_command(CommandSpec::for_resource("ctd01", "go_active"), false)
        .await
        .unwrap();

    let mut events = bus.subscribe();
    flip_link(&bus, TelemetryStatus::Available).await;

    // the transmitter drains the queue into the loopback peer
    let transmitted = tokio::time::timeout(Duration::from_secs(2), remote.recv())
        .await
        .expect("command was never transmitted")
        .unwrap();
    assert_eq!(transmitted.id, command.id);

    // ack moved it into the pending table
    loop {
        let (event, _) = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for transmit ack")
            .expect("event bus closed");
        if let RelayEvent::CommandTransmitted { queue_size } = event {
            assert_eq!(queue_size, 0);
            break;
        }
    }
    assert!(endpoint.get_queue("").await.is_empty());
    assert_eq!(endpoint.get_pending("").await.len(), 1);

    // the remote peer answers through the result sink
    endpoint
        .result_sink()
        .deliver(ResultEnvelope::new(
            command.id.clone(),
            serde_json::json!({"ok": true}),
        ))
        .await
        .unwrap();

    loop {
        let (event, meta) = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for result")
            .expect("event bus closed");
        if let RelayEvent::RemoteCommandResult { command: done } = event {
            assert_eq!(done.id, command.id);
            assert_eq!(done.status, CommandStatus::Completed);
            assert_eq!(meta.origin, "ctd01");
            break;
        }
    }
    assert!(endpoint.get_pending("").await.is_empty());

    endpoint.shutdown().await;
}

#[tokio::test]
async fn test_queue_survives_link_cycle() {
    let (endpoint, bus, mut remote) = started_endpoint("xs1").await;

    // the peer is dark: the link can come up but transmissions fail
    remote.set_reachable(false).await;

    for name in ["one", "two", "three"] {
        endpoint
            .enqueue_command(CommandSpec::for_resource("ctd01", name), false)
            .await
            .unwrap();
    }

    flip_link(&bus, TelemetryStatus::Available).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    flip_link(&bus, TelemetryStatus::Unavailable).await;
    flip_link(&bus, TelemetryStatus::Available).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // nothing was transmitted, nothing was dropped
    assert!(remote.try_recv().is_none());
    let queued = endpoint.get_queue("").await;
    assert_eq!(queued.len(), 3);
    for command in &queued {
        assert_eq!(command.status, CommandStatus::Queued);
    }
    assert!(endpoint.get_pending("").await.is_empty());

    endpoint.shutdown().await;
}

#[tokio::test]
async fn test_link_gated_enqueue_accepted_while_up() {
    let (endpoint, bus, remote) = started_endpoint("xs1").await;
    remote.set_reachable(false).await;

    flip_link(&bus, TelemetryStatus::Available).await;

    let accepted = endpoint
        .enqueue_command(CommandSpec::for_resource("ctd01", "sample_now"), true)
        .await;
    assert!(accepted.is_some());
    assert_eq!(endpoint.get_queue("").await.len(), 1);

    endpoint.shutdown().await;
}

#[tokio::test]
async fn test_clear_queue_rejected_while_up() {
    let (endpoint, bus, remote) = started_endpoint("xs1").await;
    remote.set_reachable(false).await;

    let command = endpoint
        .enqueue_command(CommandSpec::for_resource("ctd01", "go_active"), false)
        .await
        .unwrap();

    flip_link(&bus, TelemetryStatus::Available).await;

    assert!(endpoint.clear_queue("").await.is_empty());
    assert!(endpoint.pop_queue(&command.id).await.is_none());
    assert_eq!(endpoint.get_queue("").await.len(), 1);

    // back down, the same operations take effect
    flip_link(&bus, TelemetryStatus::Unavailable).await;
    let removed = endpoint.clear_queue("").await;
    assert_eq!(removed.len(), 1);
    assert!(endpoint.get_queue("").await.is_empty());

    endpoint.shutdown().await;
}

#[tokio::test]
async fn test_pending_survives_outage_until_result() {
    let (endpoint, bus, mut remote) = started_endpoint("xs1").await;

    let command = endpoint
        .enqueue_command(CommandSpec::for_resource("ctd01", "go_active"), false)
        .await
        .unwrap();

    flip_link(&bus, TelemetryStatus::Available).await;
    tokio::time::timeout(Duration::from_secs(2), remote.recv())
        .await
        .expect("command was never transmitted")
        .unwrap();

    // link drops with the command pending; it is not retransmitted
    flip_link(&bus, TelemetryStatus::Unavailable).await;
    flip_link(&bus, TelemetryStatus::Available).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(remote.try_recv().is_none());
    assert_eq!(endpoint.get_pending("").await.len(), 1);

    // the result finally lands after the outage
    endpoint
        .result_sink()
        .deliver(ResultEnvelope::new(command.id.clone(), serde_json::json!(0)))
        .await
        .unwrap();

    for _ in 0..100 {
        if endpoint.get_pending("").await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(endpoint.get_pending("").await.is_empty());

    endpoint.shutdown().await;
}

#[tokio::test]
async fn test_independent_endpoints() {
    let (endpoint_a, bus_a, _remote_a) = started_endpoint("xsA").await;
    let (endpoint_b, _bus_b, remote_b) = started_endpoint("xsB").await;
    remote_b.set_reachable(false).await;

    flip_link(&bus_a, TelemetryStatus::Available).await;

    // only endpoint A saw its bus flip
    assert_eq!(endpoint_a.link_status().await, TelemetryStatus::Available);
    assert_eq!(endpoint_b.link_status().await, TelemetryStatus::Unavailable);

    endpoint_a.shutdown().await;
    endpoint_b.shutdown().await;
}
