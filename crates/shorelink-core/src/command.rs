//! Command data structures.
//!
//! Defines the unit of work shipped across the intermittent link and the
//! draft form callers hand to the endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique command identifier, assigned at enqueue time.
pub type CommandId = String;

/// Identifier of a target device on the remote side.
pub type ResourceId = String;

/// Command lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    /// Waiting in the outbound queue, not yet transmitted
    Queued,
    /// Transmission acknowledged by the remote transport, awaiting result
    Pending,
    /// Result received and attached
    Completed,
}

impl CommandStatus {
    /// Check if the command is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommandStatus::Completed)
    }

    /// Get the status type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            CommandStatus::Queued => "queued",
            CommandStatus::Pending => "pending",
            CommandStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Caller-provided draft of a remote command.
///
/// A draft names its target either by `resource_id` (a device) or by
/// `service_name` (a remote service); the endpoint fills in identity and
/// timing when the draft is accepted into the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Target device, when addressing a device
    pub resource_id: Option<ResourceId>,
    /// Target service, when no device is addressed
    pub service_name: Option<String>,
    /// Command name (e.g., "go_active", "set_sampling_rate")
    pub command: String,
    /// Opaque command arguments
    pub args: serde_json::Value,
}

impl CommandSpec {
    /// Create a draft addressed to a device.
    pub fn for_resource(resource_id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            resource_id: Some(resource_id.into()),
            service_name: None,
            command: command.into(),
            args: serde_json::json!({}),
        }
    }

    /// Create a draft addressed to a remote service.
    pub fn for_service(service_name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            resource_id: None,
            service_name: Some(service_name.into()),
            command: command.into(),
            args: serde_json::json!({}),
        }
    }

    /// Set command arguments.
    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        self.args = args;
        self
    }

    /// A draft must carry a non-empty command name to be accepted.
    pub fn is_well_formed(&self) -> bool {
        !self.command.trim().is_empty()
    }
}

/// A unit of work destined for the remote side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCommand {
    /// Unique command ID
    pub id: CommandId,
    /// Target device, when addressing a device
    pub resource_id: Option<ResourceId>,
    /// Target service, when no device is addressed
    pub service_name: Option<String>,
    /// Command name
    pub command: String,
    /// Opaque command arguments
    pub args: serde_json::Value,
    /// Timestamp of acceptance into the outbound queue
    pub time_queued: DateTime<Utc>,
    /// Timestamp of result receipt, unset until resulted
    pub time_completed: Option<DateTime<Utc>>,
    /// Result payload from the remote side, unset until resulted
    pub result: Option<serde_json::Value>,
    /// Current lifecycle status
    pub status: CommandStatus,
}

impl RemoteCommand {
    /// Accept a draft into the queue: assign a fresh id and queue timestamp.
    pub fn from_spec(spec: CommandSpec) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            resource_id: spec.resource_id,
            service_name: spec.service_name,
            command: spec.command,
            args: spec.args,
            time_queued: Utc::now(),
            time_completed: None,
            result: None,
            status: CommandStatus::Queued,
        }
    }

    /// Resolve the event routing key for this command.
    ///
    /// The target device wins; a service target is scoped by the endpoint's
    /// exchange scope. A command with neither target cannot be routed.
    pub fn origin(&self, scope: &str) -> Result<String, CommandError> {
        if let Some(resource_id) = &self.resource_id {
            Ok(resource_id.clone())
        } else if let Some(service_name) = &self.service_name {
            Ok(format!("{}{}", service_name, scope))
        } else {
            Err(CommandError::OriginUndeterminable(self.id.clone()))
        }
    }

    /// Check whether this command matches a resource filter.
    ///
    /// The empty string matches everything.
    pub fn matches_resource(&self, resource_id: &str) -> bool {
        resource_id.is_empty() || self.resource_id.as_deref() == Some(resource_id)
    }

    /// Attach a result and stamp the completion time.
    pub fn complete(&mut self, result: serde_json::Value) {
        self.time_completed = Some(Utc::now());
        self.result = Some(result);
        self.status = CommandStatus::Completed;
    }
}

/// Command error types.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("command {0} has neither resource id nor service name")]
    OriginUndeterminable(CommandId),
}
