//! Relay event model.
//!
//! Events exchanged over the relay event bus: the link telemetry the
//! endpoint consumes and the notifications it publishes. Every published
//! event travels with metadata carrying its origin routing key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::RemoteCommand;

/// Link-level connectivity signal, independent of command content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TelemetryStatus {
    /// The remote link can carry traffic
    Available,
    /// The remote link is down
    Unavailable,
}

impl TelemetryStatus {
    /// Check if the link can carry traffic.
    pub fn is_available(&self) -> bool {
        matches!(self, TelemetryStatus::Available)
    }

    /// Get the status type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            TelemetryStatus::Available => "available",
            TelemetryStatus::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for TelemetryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Metadata attached to every event on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event ID
    pub event_id: String,
    /// Routing key: a resource id, a scoped service name, or the endpoint scope
    pub origin: String,
    /// Publication timestamp
    pub timestamp: DateTime<Utc>,
}

impl EventMetadata {
    /// Create metadata for an event from the given origin.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            origin: origin.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Events carried on the relay bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RelayEvent {
    /// Inbound link telemetry, consumed by the endpoint
    TelemetryUpdate {
        /// Reported link status
        status: TelemetryStatus,
    },
    /// Public link availability, published when the link flips
    LinkAvailability {
        /// Link status after the flip
        status: TelemetryStatus,
    },
    /// A command transmission was acknowledged by the remote transport
    CommandTransmitted {
        /// Commands still waiting to be transmitted
        queue_size: usize,
    },
    /// The outbound queue was modified
    QueueModified {
        /// Commands still waiting to be transmitted
        queue_size: usize,
    },
    /// A command completed with a result from the remote side
    RemoteCommandResult {
        /// The command, with result and completion time attached
        command: RemoteCommand,
    },
}

impl RelayEvent {
    /// Check if this is inbound link telemetry.
    pub fn is_telemetry(&self) -> bool {
        matches!(self, RelayEvent::TelemetryUpdate { .. })
    }

    /// Check if this is a public link availability notification.
    pub fn is_link_event(&self) -> bool {
        matches!(self, RelayEvent::LinkAvailability { .. })
    }

    /// Check if this reports a change to the outbound queue.
    pub fn is_queue_event(&self) -> bool {
        matches!(
            self,
            RelayEvent::CommandTransmitted { .. } | RelayEvent::QueueModified { .. }
        )
    }

    /// Check if this carries a completed command.
    pub fn is_result(&self) -> bool {
        matches!(self, RelayEvent::RemoteCommandResult { .. })
    }

    /// Get the event type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            RelayEvent::TelemetryUpdate { .. } => "telemetry_update",
            RelayEvent::LinkAvailability { .. } => "link_availability",
            RelayEvent::CommandTransmitted { .. } => "command_transmitted",
            RelayEvent::QueueModified { .. } => "queue_modified",
            RelayEvent::RemoteCommandResult { .. } => "remote_command_result",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandSpec;

    #[test]
    fn test_telemetry_status() {
        assert!(TelemetryStatus::Available.is_available());
        assert!(!TelemetryStatus::Unavailable.is_available());
        assert_eq!(TelemetryStatus::Unavailable.to_string(), "unavailable");
    }

    #[test]
    fn test_event_predicates() {
        let telemetry = RelayEvent::TelemetryUpdate {
            status: TelemetryStatus::Available,
        };
        assert!(telemetry.is_telemetry());
        assert!(!telemetry.is_queue_event());

        let modified = RelayEvent::QueueModified { queue_size: 3 };
        assert!(modified.is_queue_event());
        assert!(!modified.is_result());

        let transmitted = RelayEvent::CommandTransmitted { queue_size: 2 };
        assert!(transmitted.is_queue_event());

        let command = RemoteCommand::from_spec(CommandSpec::for_resource("r1", "ping"));
        let result = RelayEvent::RemoteCommandResult { command };
        assert!(result.is_result());
        assert_eq!(result.type_name(), "remote_command_result");
    }

    #[test]
    fn test_metadata_carries_origin() {
        let meta = EventMetadata::new("xs1");
        assert_eq!(meta.origin, "xs1");
        assert!(!meta.event_id.is_empty());
    }
}
