//! Core types for the shorelink command relay.
//!
//! Provides:
//! - Command data structures shared between the terrestrial and remote sides
//! - Relay event model and broadcast event bus
//! - Endpoint configuration

pub mod command;
pub mod config;
pub mod event;
pub mod eventbus;

// Re-exports
pub use command::{CommandError, CommandId, CommandSpec, CommandStatus, RemoteCommand, ResourceId};

pub use config::{ConfigError, RelayConfig};

pub use event::{EventMetadata, RelayEvent, TelemetryStatus};

pub use eventbus::{EventBus, EventBusReceiver, FilteredReceiver};
