//! ExclusiveGateway and ParallelGateway behaviors.

use procflow_types::error::ExecutionError;
use procflow_types::node::State;

use crate::gateway::{self, ForkOutcome, JoinPolicy};

use super::{AdvanceContext, Next, NodeBehavior};

/// Merges on the first arriving branch and diverges along exactly one
/// outgoing flow.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExclusiveGatewayBehavior;

impl NodeBehavior for ExclusiveGatewayBehavior {
    fn advance(&self, ctx: &mut AdvanceContext<'_>) -> Result<Next, ExecutionError> {
        let id = ctx.node_id().to_string();

        if ctx.state()?.is_none() {
            ctx.change_state(State::Start)?;
            gateway::prepare_exclusive_fork(ctx.tree_mut(), &id)?;
        }

        if matches!(ctx.state()?, Some(State::Start | State::Wait)) {
            let node = ctx.node()?;
            if !gateway::join_satisfied(ctx.tree(), node, JoinPolicy::Any)? {
                ctx.change_state(State::Wait)?;
                return Ok(Next::Halt);
            }

            match gateway::resolve_exclusive_fork(ctx.tree(), node)? {
                ForkOutcome::Pending(flows) => {
                    ctx.change_state(State::Wait)?;
                    return Ok(Next::many(flows));
                }
                ForkOutcome::Resolved(selected) => {
                    ctx.change_state(State::End)?;
                    if let Some(flow) = selected {
                        gateway::unlock_selected_flow(ctx.tree_mut(), &flow)?;
                    }
                }
            }
        }

        let node = ctx.node()?;
        if node.has_ended() {
            Ok(Next::One(gateway::exclusive_target(ctx.tree(), node)?))
        } else {
            Ok(Next::Halt)
        }
    }
}

/// Merges once every branch has arrived and diverges along all outgoing
/// flows.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParallelGatewayBehavior;

impl NodeBehavior for ParallelGatewayBehavior {
    fn advance(&self, ctx: &mut AdvanceContext<'_>) -> Result<Next, ExecutionError> {
        if ctx.state()?.is_none() {
            ctx.change_state(State::Start)?;
        }

        if matches!(ctx.state()?, Some(State::Start | State::Wait)) {
            if !gateway::join_satisfied(ctx.tree(), ctx.node()?, JoinPolicy::All)? {
                ctx.change_state(State::Wait)?;
                return Ok(Next::Halt);
            }
            ctx.change_state(State::End)?;
        }

        let node = ctx.node()?;
        if node.has_ended() {
            Ok(Next::many(gateway::parallel_targets(node)?))
        } else {
            Ok(Next::Halt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopObserver;
    use procflow_types::node::{FlowData, Node, NodeKind};
    use procflow_types::process::Process;
    use procflow_types::tree::ProcessTree;
    use serde_json::Map;

    fn flow(id: &str, source: &str, target: &str) -> Node {
        Node::new(id, "sequenceFlow", NodeKind::SequenceFlow(FlowData::new(source, target)))
            .with_parent("proc")
    }

    fn process() -> Process {
        let mut tree = ProcessTree::new(Node::new("proc", "process", NodeKind::Process));
        tree.insert(
            Node::new("join", "parallelGateway", NodeKind::ParallelGateway)
                .with_parent("proc")
                .with_incoming("in1")
                .with_incoming("in2")
                .with_outgoing("out1")
                .with_outgoing("out2"),
        );
        tree.insert(
            Node::new(
                "xor",
                "exclusiveGateway",
                NodeKind::ExclusiveGateway {
                    default: Some("out2".to_string()),
                },
            )
            .with_parent("proc")
            .with_incoming("in1")
            .with_outgoing("out1")
            .with_outgoing("out2"),
        );
        tree.insert(flow("in1", "a", "join"));
        tree.insert(flow("in2", "b", "join"));
        tree.insert(flow("out1", "join", "c"));
        tree.insert(flow("out2", "join", "d"));
        Process::from_tree(tree, Map::new())
    }

    fn advance(process: &mut Process, id: &str, behavior: &dyn NodeBehavior) -> Result<Next, ExecutionError> {
        let mut ctx = AdvanceContext::new(process, id, &NoopObserver);
        behavior.advance(&mut ctx)
    }

    fn end(process: &mut Process, id: &str) {
        process.tree.get_mut(id).unwrap().state = Some(State::End);
    }

    #[test]
    fn test_parallel_join_waits_for_all_branches() {
        let mut process = process();
        assert_eq!(advance(&mut process, "join", &ParallelGatewayBehavior).unwrap(), Next::Halt);
        assert_eq!(process.tree.get("join").unwrap().state, Some(State::Wait));

        end(&mut process, "in2");
        assert_eq!(advance(&mut process, "join", &ParallelGatewayBehavior).unwrap(), Next::Halt);

        end(&mut process, "in1");
        assert_eq!(
            advance(&mut process, "join", &ParallelGatewayBehavior).unwrap(),
            Next::Many(vec!["out1".to_string(), "out2".to_string()])
        );
        assert_eq!(process.tree.get("join").unwrap().state, Some(State::End));
    }

    #[test]
    fn test_exclusive_fork_requests_evaluation() {
        let mut process = process();
        end(&mut process, "in1");

        let next = advance(&mut process, "xor", &ExclusiveGatewayBehavior).unwrap();
        assert_eq!(next, Next::Many(vec!["out1".to_string()]));
        assert_eq!(process.tree.get("xor").unwrap().state, Some(State::Wait));

        let out1 = process.tree.get("out1").unwrap().flow().unwrap();
        assert!(out1.execute_previous_when_evaluated);
        let out2 = process.tree.get("out2").unwrap().flow().unwrap();
        assert!(!out2.execute_previous_when_evaluated);
    }

    #[test]
    fn test_exclusive_fork_proceeds_once_evaluated() {
        let mut process = process();
        end(&mut process, "in1");
        advance(&mut process, "xor", &ExclusiveGatewayBehavior).unwrap();

        {
            let node = process.tree.get_mut("out1").unwrap();
            node.state = Some(State::End);
            let flow = node.flow_mut().unwrap();
            flow.evaluated = true;
            flow.selected = Some(true);
        }

        let next = advance(&mut process, "xor", &ExclusiveGatewayBehavior).unwrap();
        assert_eq!(next, Next::One("out1".to_string()));
        assert_eq!(process.tree.get("xor").unwrap().state, Some(State::End));
        assert!(
            !process
                .tree
                .get("out1")
                .unwrap()
                .flow()
                .unwrap()
                .execute_previous_when_evaluated
        );

        // Ended gateways keep pointing at the same flow.
        let again = advance(&mut process, "xor", &ExclusiveGatewayBehavior).unwrap();
        assert_eq!(again, next);
    }
}
