//! Per-type node state machines.
//!
//! Every executable element type implements [`NodeBehavior`]. The executor
//! resolves the behavior for a node through the [`NodeRegistry`](crate::registry::NodeRegistry),
//! hands it an [`AdvanceContext`] scoped to that node, and follows the
//! returned [`Next`] set.
//!
//! State only ever moves forward (`None -> Start -> Wait -> End`) and every
//! transition goes through [`AdvanceContext::change_state`], which consults
//! the notification hook before committing.

pub mod context;
pub mod event;
pub mod flow;
pub mod gateway;
pub mod scope;
pub mod task;

use procflow_types::error::ExecutionError;
use procflow_types::node::Node;

pub use context::AdvanceContext;
pub use event::{EndEventBehavior, StartEventBehavior};
pub use flow::SequenceFlowBehavior;
pub use gateway::{ExclusiveGatewayBehavior, ParallelGatewayBehavior};
pub use scope::ScopeBehavior;
pub use task::TaskBehavior;

/// The node ids to visit after an advance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Next {
    /// Nothing to do on this branch yet.
    #[default]
    Halt,
    /// Continue with exactly one node.
    One(String),
    /// Fan out to each node, in order.
    Many(Vec<String>),
}

impl Next {
    /// Build a fan-out, collapsing an empty list to [`Next::Halt`].
    pub fn many(ids: Vec<String>) -> Self {
        if ids.is_empty() {
            Next::Halt
        } else {
            Next::Many(ids)
        }
    }

    pub fn is_halt(&self) -> bool {
        matches!(self, Next::Halt)
    }

    pub fn into_ids(self) -> Vec<String> {
        match self {
            Next::Halt => Vec::new(),
            Next::One(id) => vec![id],
            Next::Many(ids) => ids,
        }
    }
}

/// The `advance` capability of one element type.
///
/// Implementations read and mutate the process only through the context.
/// A returned error is an execution-contract violation; whatever state the
/// node had already committed stays committed.
pub trait NodeBehavior: Send + Sync {
    fn advance(&self, ctx: &mut AdvanceContext<'_>) -> Result<Next, ExecutionError>;
}

/// The id of the first outgoing edge of `node`.
///
/// Fails when the node has no outgoing edge or the edge has a blank id.
pub fn first_outgoing(node: &Node) -> Result<String, ExecutionError> {
    let edge = node
        .outgoing
        .first()
        .ok_or_else(|| ExecutionError::MissingOutgoingFlow(node.debug_name()))?;
    edge.id()
        .map(str::to_string)
        .ok_or_else(|| ExecutionError::MissingFlowId(node.debug_name()))
}
