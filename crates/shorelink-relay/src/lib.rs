//! Terrestrial command relay endpoint.
//!
//! Provides:
//! - A manipulable outbound command queue with inspect, clear and pop
//! - A pending-command table reconciling acknowledgements and results
//! - A telemetry-driven link monitor
//! - Transport client/server contracts and a loopback implementation

pub mod callbacks;
pub mod client;
pub mod endpoint;
pub mod link;
pub mod loopback;
pub mod server;
pub mod store;
pub mod transport;

// Re-exports
pub use callbacks::EndpointCallbacks;

pub use client::RelayClient;

pub use endpoint::RelayEndpoint;

pub use link::{LinkMonitor, RemoteAddr};

pub use loopback::{LoopbackRemote, LoopbackTransport};

pub use server::{RelayServer, ResultSink};

pub use store::{AckOutcome, CompleteOutcome, RelayStore, StoreError};

pub use transport::{CommandTransport, ResultEnvelope, TransportError};
