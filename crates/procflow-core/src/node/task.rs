//! Task behavior, shared by every task-like tag.

use procflow_types::error::ExecutionError;
use procflow_types::node::State;
use serde_json::Value;

use super::{AdvanceContext, Next, NodeBehavior, first_outgoing};

/// Waits until the process input for this node carries `state: "end"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskBehavior;

impl TaskBehavior {
    fn completion_signalled(ctx: &AdvanceContext<'_>) -> bool {
        ctx.input()
            .and_then(|input| input.get("state"))
            .and_then(Value::as_str)
            == Some(State::End.as_str())
    }
}

impl NodeBehavior for TaskBehavior {
    fn advance(&self, ctx: &mut AdvanceContext<'_>) -> Result<Next, ExecutionError> {
        if ctx.state()?.is_none() {
            ctx.change_state(State::Start)?;
        }

        if matches!(ctx.state()?, Some(State::Start | State::Wait)) {
            if !Self::completion_signalled(ctx) {
                ctx.change_state(State::Wait)?;
                return Ok(Next::Halt);
            }
            ctx.change_state(State::End)?;
        }

        let node = ctx.node()?;
        if node.has_ended() {
            Ok(Next::One(first_outgoing(node)?))
        } else {
            Ok(Next::Halt)
        }
    }
}
