//! Event types for the procflow engine event bus.
//!
//! `ProcessEvent` is broadcast while a trigger call walks a process.
//! All variants are Clone + Send + Sync for use with tokio broadcast channels.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::node::State;

/// Events emitted during process execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessEvent {
    /// A node is about to change state. Emitted before the change is applied.
    NodeStateChanging {
        process_id: Uuid,
        node_id: String,
        uid: Option<String>,
        tag: String,
        from: Option<State>,
        to: State,
    },

    /// A trigger call started at `node_id`.
    TriggerStarted { process_id: Uuid, node_id: String },

    /// A trigger call finished; branch failures do not prevent completion.
    TriggerCompleted {
        process_id: Uuid,
        steps: usize,
        failures: usize,
        root_state: Option<State>,
    },

    /// A trigger call aborted with a fatal error.
    TriggerFailed { process_id: Uuid, error: String },

    /// A node reached during the walk failed; only its branch stopped.
    BranchFailed {
        process_id: Uuid,
        node_id: String,
        error: String,
    },
}

impl ProcessEvent {
    pub fn process_id(&self) -> Uuid {
        match self {
            ProcessEvent::NodeStateChanging { process_id, .. }
            | ProcessEvent::TriggerStarted { process_id, .. }
            | ProcessEvent::TriggerCompleted { process_id, .. }
            | ProcessEvent::TriggerFailed { process_id, .. }
            | ProcessEvent::BranchFailed { process_id, .. } => *process_id,
        }
    }

    /// Node the event refers to, for node-scoped variants.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            ProcessEvent::NodeStateChanging { node_id, .. }
            | ProcessEvent::TriggerStarted { node_id, .. }
            | ProcessEvent::BranchFailed { node_id, .. } => Some(node_id),
            ProcessEvent::TriggerCompleted { .. } | ProcessEvent::TriggerFailed { .. } => None,
        }
    }
}
