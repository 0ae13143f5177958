//! SequenceFlow behavior and condition coercion.

use procflow_types::error::ExecutionError;
use procflow_types::node::State;
use serde_json::Value;

use super::context::flow_data_mut;
use super::{AdvanceContext, Next, NodeBehavior};

/// Loose truthiness used for externally supplied conditions.
///
/// `false`, `0`, `""`, `"0"`, empty arrays and empty objects are false;
/// everything else is true. `null` never reaches this function.
pub fn condition_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Advances a sequence flow.
///
/// Unconditional flows end at once and are marked selected. Conditional flows
/// wait until `input[id].condition` is present, then record the outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequenceFlowBehavior;

impl NodeBehavior for SequenceFlowBehavior {
    fn advance(&self, ctx: &mut AdvanceContext<'_>) -> Result<Next, ExecutionError> {
        let id = ctx.node_id().to_string();

        if ctx.state()?.is_none() {
            ctx.change_state(State::Start)?;
        }

        if matches!(ctx.state()?, Some(State::Start | State::Wait)) {
            let selected = if ctx.flow(&id)?.conditional {
                let condition = ctx
                    .input()
                    .and_then(|input| input.get("condition"))
                    .filter(|c| !c.is_null())
                    .map(condition_truthy);
                match condition {
                    Some(selected) => selected,
                    None => {
                        ctx.change_state(State::Wait)?;
                        return Ok(Next::Halt);
                    }
                }
            } else {
                true
            };

            ctx.change_state(State::End)?;
            let flow = flow_data_mut(ctx.tree_mut(), &id)?;
            flow.selected = Some(selected);
            flow.evaluated = true;
        }

        let node = ctx.node()?;
        if !node.has_ended() {
            return Ok(Next::Halt);
        }
        let flow = ctx.flow(&id)?;

        if flow.execute_previous_when_evaluated {
            return flow
                .source_ref
                .clone()
                .map(Next::One)
                .ok_or_else(|| ExecutionError::MissingSourceRef(node.debug_name()));
        }
        if flow.conditional && !flow.is_selected() {
            return Ok(Next::Halt);
        }
        flow.target_ref
            .clone()
            .map(Next::One)
            .ok_or_else(|| ExecutionError::MissingTargetRef(node.debug_name()))
    }
}
