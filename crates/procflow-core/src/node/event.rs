//! StartEvent and EndEvent behaviors.

use procflow_types::error::ExecutionError;
use procflow_types::node::State;

use super::{AdvanceContext, Next, NodeBehavior, first_outgoing};

/// Starts a scope: immediately ends and hands control to its outgoing flow.
#[derive(Debug, Default, Clone, Copy)]
pub struct StartEventBehavior;

impl NodeBehavior for StartEventBehavior {
    fn advance(&self, ctx: &mut AdvanceContext<'_>) -> Result<Next, ExecutionError> {
        if ctx.state()?.is_none() {
            ctx.change_state(State::Start)?;
        }

        match ctx.state()? {
            Some(State::Start) => {
                let flow = first_outgoing(ctx.node()?)?;
                ctx.change_state(State::End)?;
                Ok(Next::One(flow))
            }
            Some(State::End) => Ok(Next::One(first_outgoing(ctx.node()?)?)),
            _ => Ok(Next::Halt),
        }
    }
}

/// Ends a scope: ends immediately and hands control back to the enclosing
/// Process/SubProcess, which observes the END.
#[derive(Debug, Default, Clone, Copy)]
pub struct EndEventBehavior;

impl NodeBehavior for EndEventBehavior {
    fn advance(&self, ctx: &mut AdvanceContext<'_>) -> Result<Next, ExecutionError> {
        if ctx.state()?.is_none() {
            ctx.change_state(State::Start)?;
        }
        if ctx.state()? == Some(State::Start) {
            ctx.change_state(State::End)?;
        }

        let node = ctx.node()?;
        if !node.has_ended() {
            return Ok(Next::Halt);
        }
        node.parent_id
            .clone()
            .map(Next::One)
            .ok_or_else(|| ExecutionError::MissingParent(node.debug_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopObserver;
    use procflow_types::node::{Node, NodeKind};
    use procflow_types::process::Process;
    use procflow_types::tree::ProcessTree;
    use serde_json::Map;

    fn process() -> Process {
        let mut tree = ProcessTree::new(Node::new("proc", "process", NodeKind::Process));
        tree.insert(
            Node::new("start", "startEvent", NodeKind::StartEvent)
                .with_parent("proc")
                .with_outgoing("f1"),
        );
        tree.insert(Node::new("lonely", "startEvent", NodeKind::StartEvent).with_parent("proc"));
        tree.insert(Node::new("end", "endEvent", NodeKind::EndEvent).with_parent("proc"));
        tree.insert(Node::new("orphan", "endEvent", NodeKind::EndEvent));
        Process::from_tree(tree, Map::new())
    }

    fn advance(process: &mut Process, id: &str, behavior: &dyn NodeBehavior) -> Result<Next, ExecutionError> {
        let mut ctx = AdvanceContext::new(process, id, &NoopObserver);
        behavior.advance(&mut ctx)
    }

    #[test]
    fn test_start_event_ends_and_emits_flow() {
        let mut process = process();
        let next = advance(&mut process, "start", &StartEventBehavior).unwrap();
        assert_eq!(next, Next::One("f1".to_string()));
        assert_eq!(process.tree.get("start").unwrap().state, Some(State::End));

        // Idempotent once ended.
        let again = advance(&mut process, "start", &StartEventBehavior).unwrap();
        assert_eq!(again, next);
        assert_eq!(process.tree.get("start").unwrap().state, Some(State::End));
    }

    #[test]
    fn test_start_event_without_outgoing_fails_after_starting() {
        let mut process = process();
        let err = advance(&mut process, "lonely", &StartEventBehavior).unwrap_err();
        assert!(matches!(err, ExecutionError::MissingOutgoingFlow(_)));
        assert_eq!(process.tree.get("lonely").unwrap().state, Some(State::Start));
    }

    #[test]
    fn test_end_event_emits_parent() {
        let mut process = process();
        let next = advance(&mut process, "end", &EndEventBehavior).unwrap();
        assert_eq!(next, Next::One("proc".to_string()));
        assert_eq!(process.tree.get("end").unwrap().state, Some(State::End));
    }

    #[test]
    fn test_end_event_without_parent_fails() {
        let mut process = process();
        let err = advance(&mut process, "orphan", &EndEventBehavior).unwrap_err();
        assert!(matches!(err, ExecutionError::MissingParent(_)));
    }
}
