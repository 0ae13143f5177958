//! Gateway synchronizer: fork/join and conditional selection.
//!
//! These functions are pure over the tree state, so the outcome of a series
//! of trigger calls does not depend on the order in which branches arrive.
//!
//! - Join (fan-in > 1): a parallel gateway needs *all* incoming flows ended,
//!   an exclusive gateway needs *any* of them.
//! - Fork (fan-out > 1): a parallel gateway emits every outgoing flow. An
//!   exclusive gateway first asks each non-default outgoing flow to evaluate
//!   its condition (the flow hands control back to the gateway afterwards),
//!   then picks the single selected flow or falls back to the default.

use procflow_types::error::ExecutionError;
use procflow_types::node::{EdgeRef, Node, State};
use procflow_types::tree::ProcessTree;

use crate::node::context::{flow_data, flow_data_mut};
use crate::node::first_outgoing;

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// How many incoming flows a merging gateway waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPolicy {
    /// Every incoming flow must have ended.
    All,
    /// The first ended incoming flow is enough.
    Any,
}

/// Whether `gateway` may proceed past its join.
///
/// Always true for a gateway with at most one incoming flow.
pub fn join_satisfied(
    tree: &ProcessTree,
    gateway: &Node,
    policy: JoinPolicy,
) -> Result<bool, ExecutionError> {
    if gateway.incoming.len() <= 1 {
        return Ok(true);
    }

    let mut ended = Vec::with_capacity(gateway.incoming.len());
    for edge in &gateway.incoming {
        let node = lookup(tree, edge_id(gateway, edge)?)?;
        ended.push(node.has_ended());
    }

    Ok(match policy {
        JoinPolicy::All => ended.iter().all(|e| *e),
        JoinPolicy::Any => ended.iter().any(|e| *e),
    })
}

// ---------------------------------------------------------------------------
// Exclusive fork
// ---------------------------------------------------------------------------

/// Outcome of checking an exclusive fork.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForkOutcome {
    /// Some outgoing flows have not evaluated their condition yet. Carries
    /// the ones that still need to be advanced; flows already waiting for
    /// input are left out so the gateway does not bounce between them.
    Pending(Vec<String>),
    /// Every condition is in. Carries the selected flow, or `None` when the
    /// default flow applies.
    Resolved(Option<String>),
}

/// Mark every non-default outgoing flow of a diverging exclusive gateway as
/// awaiting evaluation, to be handed back to the gateway once evaluated.
pub fn prepare_exclusive_fork(
    tree: &mut ProcessTree,
    gateway_id: &str,
) -> Result<(), ExecutionError> {
    let gateway = lookup(tree, gateway_id)?;
    if gateway.outgoing.len() <= 1 {
        return Ok(());
    }

    let default = gateway.default_flow();
    let mut flow_ids = Vec::with_capacity(gateway.outgoing.len());
    for edge in &gateway.outgoing {
        let id = edge_id(gateway, edge)?;
        if default != Some(id) {
            flow_ids.push(id.to_string());
        }
    }

    for id in flow_ids {
        let flow = flow_data_mut(tree, &id)?;
        flow.evaluated = false;
        flow.execute_previous_when_evaluated = true;
    }
    Ok(())
}

/// Check the outgoing flows of an exclusive gateway.
///
/// Fails when more than one flow is selected, or when none is selected and
/// the gateway has no default flow. Does not mutate the tree; see
/// [`unlock_selected_flow`].
pub fn resolve_exclusive_fork(
    tree: &ProcessTree,
    gateway: &Node,
) -> Result<ForkOutcome, ExecutionError> {
    if gateway.outgoing.len() <= 1 {
        return Ok(ForkOutcome::Resolved(None));
    }

    let default = gateway.default_flow();
    let mut awaiting = Vec::new();
    let mut selected = Vec::new();

    for edge in &gateway.outgoing {
        let id = edge_id(gateway, edge)?;
        let flow = flow_data(tree, id)?;
        if !flow.evaluated && default != Some(id) {
            awaiting.push(id);
        }
        if flow.is_selected() {
            selected.push(id.to_string());
        }
    }

    if !awaiting.is_empty() {
        let runnable = awaiting
            .into_iter()
            .filter(|id| tree.get(id).and_then(|n| n.state) != Some(State::Wait))
            .map(str::to_string)
            .collect();
        return Ok(ForkOutcome::Pending(runnable));
    }

    match selected.len() {
        0 if default.is_none() => Err(ExecutionError::NoSelectedFlow(gateway.debug_name())),
        0 => Ok(ForkOutcome::Resolved(None)),
        1 => Ok(ForkOutcome::Resolved(selected.pop())),
        _ => Err(ExecutionError::MultipleSelectedFlows {
            gateway: gateway.debug_name(),
            flows: selected,
        }),
    }
}

/// Switch the selected flow to forward execution.
pub fn unlock_selected_flow(tree: &mut ProcessTree, flow_id: &str) -> Result<(), ExecutionError> {
    flow_data_mut(tree, flow_id)?.execute_previous_when_evaluated = false;
    Ok(())
}

/// The flow an ended exclusive gateway continues along.
///
/// With several outgoing flows this is the first selected one, else the
/// default; with a single outgoing flow it is that flow.
pub fn exclusive_target(tree: &ProcessTree, gateway: &Node) -> Result<String, ExecutionError> {
    if gateway.outgoing.len() <= 1 {
        return first_outgoing(gateway);
    }

    for edge in &gateway.outgoing {
        let id = edge_id(gateway, edge)?;
        if flow_data(tree, id)?.is_selected() {
            return Ok(id.to_string());
        }
    }
    gateway
        .default_flow()
        .map(str::to_string)
        .ok_or_else(|| ExecutionError::NoSelectedFlow(gateway.debug_name()))
}

// ---------------------------------------------------------------------------
// Parallel fork
// ---------------------------------------------------------------------------

/// Every outgoing flow id of a parallel gateway.
pub fn parallel_targets(gateway: &Node) -> Result<Vec<String>, ExecutionError> {
    gateway
        .outgoing
        .iter()
        .map(|edge| edge_id(gateway, edge).map(str::to_string))
        .collect()
}

fn edge_id<'e>(gateway: &Node, edge: &'e EdgeRef) -> Result<&'e str, ExecutionError> {
    edge.id().ok_or_else(|| ExecutionError::MissingFlowId(gateway.debug_name()))
}

fn lookup<'t>(tree: &'t ProcessTree, id: &str) -> Result<&'t Node, ExecutionError> {
    tree.get(id).ok_or_else(|| ExecutionError::NodeNotFound {
        id: id.to_string(),
        root: tree.root().debug_name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use procflow_types::node::{FlowData, NodeKind};

    /// gw with outgoing a, b, c (c is the default) and incoming i1, i2.
    fn tree(default: Option<&str>) -> ProcessTree {
        let mut tree = ProcessTree::new(Node::new("proc", "process", NodeKind::Process));
        let mut gateway = Node::new(
            "gw",
            "exclusiveGateway",
            NodeKind::ExclusiveGateway {
                default: default.map(str::to_string),
            },
        )
        .with_parent("proc")
        .with_incoming("i1")
        .with_incoming("i2");
        for id in ["a", "b", "c"] {
            gateway = gateway.with_outgoing(id);
            let mut flow = FlowData::new("gw", format!("{id}_target"));
            flow.conditional = true;
            tree.insert(
                Node::new(id, "sequenceFlow", NodeKind::SequenceFlow(flow)).with_parent("proc"),
            );
        }
        for id in ["i1", "i2"] {
            tree.insert(
                Node::new(id, "sequenceFlow", NodeKind::SequenceFlow(FlowData::new("x", "gw")))
                    .with_parent("proc"),
            );
        }
        tree.insert(gateway);
        tree
    }

    fn evaluate(tree: &mut ProcessTree, id: &str, selected: bool) {
        let node = tree.get_mut(id).unwrap();
        node.state = Some(State::End);
        let flow = node.flow_mut().unwrap();
        flow.evaluated = true;
        flow.selected = Some(selected);
    }

    fn gateway(tree: &ProcessTree) -> Node {
        tree.get("gw").unwrap().clone()
    }

    #[test]
    fn test_join_policies() {
        let mut tree = tree(None);
        let gw = gateway(&tree);
        assert!(!join_satisfied(&tree, &gw, JoinPolicy::Any).unwrap());

        tree.get_mut("i2").unwrap().state = Some(State::End);
        assert!(join_satisfied(&tree, &gw, JoinPolicy::Any).unwrap());
        assert!(!join_satisfied(&tree, &gw, JoinPolicy::All).unwrap());

        tree.get_mut("i1").unwrap().state = Some(State::End);
        assert!(join_satisfied(&tree, &gw, JoinPolicy::All).unwrap());
    }

    #[test]
    fn test_join_is_order_independent() {
        let mut first = tree(None);
        first.get_mut("i1").unwrap().state = Some(State::End);
        first.get_mut("i2").unwrap().state = Some(State::End);

        let mut second = tree(None);
        second.get_mut("i2").unwrap().state = Some(State::End);
        second.get_mut("i1").unwrap().state = Some(State::End);

        let gw = gateway(&first);
        assert_eq!(
            join_satisfied(&first, &gw, JoinPolicy::All).unwrap(),
            join_satisfied(&second, &gw, JoinPolicy::All).unwrap()
        );
    }

    #[test]
    fn test_prepare_marks_non_default_flows() {
        let mut tree = tree(Some("c"));
        prepare_exclusive_fork(&mut tree, "gw").unwrap();

        for id in ["a", "b"] {
            let flow = tree.get(id).unwrap().flow().unwrap();
            assert!(flow.execute_previous_when_evaluated);
            assert!(!flow.evaluated);
        }
        assert!(!tree.get("c").unwrap().flow().unwrap().execute_previous_when_evaluated);
    }

    #[test]
    fn test_pending_skips_waiting_flows() {
        let mut tree = tree(Some("c"));
        prepare_exclusive_fork(&mut tree, "gw").unwrap();
        tree.get_mut("a").unwrap().state = Some(State::Wait);

        let gw = gateway(&tree);
        assert_eq!(
            resolve_exclusive_fork(&tree, &gw).unwrap(),
            ForkOutcome::Pending(vec!["b".to_string()])
        );

        tree.get_mut("b").unwrap().state = Some(State::Wait);
        assert_eq!(
            resolve_exclusive_fork(&tree, &gw).unwrap(),
            ForkOutcome::Pending(Vec::new())
        );
    }

    #[test]
    fn test_single_selected_flow_resolves() {
        let mut tree = tree(Some("c"));
        prepare_exclusive_fork(&mut tree, "gw").unwrap();
        evaluate(&mut tree, "a", false);
        evaluate(&mut tree, "b", true);

        let gw = gateway(&tree);
        assert_eq!(
            resolve_exclusive_fork(&tree, &gw).unwrap(),
            ForkOutcome::Resolved(Some("b".to_string()))
        );
        unlock_selected_flow(&mut tree, "b").unwrap();
        assert!(!tree.get("b").unwrap().flow().unwrap().execute_previous_when_evaluated);
        assert_eq!(exclusive_target(&tree, &gw).unwrap(), "b");
    }

    #[test]
    fn test_nothing_selected_falls_back_to_default() {
        let mut tree = tree(Some("c"));
        prepare_exclusive_fork(&mut tree, "gw").unwrap();
        evaluate(&mut tree, "a", false);
        evaluate(&mut tree, "b", false);

        let gw = gateway(&tree);
        assert_eq!(
            resolve_exclusive_fork(&tree, &gw).unwrap(),
            ForkOutcome::Resolved(None)
        );
        assert_eq!(exclusive_target(&tree, &gw).unwrap(), "c");
    }

    #[test]
    fn test_multiple_selected_flows_fail() {
        let mut tree = tree(Some("c"));
        prepare_exclusive_fork(&mut tree, "gw").unwrap();
        evaluate(&mut tree, "a", true);
        evaluate(&mut tree, "b", true);

        let gw = gateway(&tree);
        let err = resolve_exclusive_fork(&tree, &gw).unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::MultipleSelectedFlows { ref flows, .. } if flows == &["a", "b"]
        ));
    }

    #[test]
    fn test_no_selection_without_default_fails() {
        let mut tree = tree(None);
        prepare_exclusive_fork(&mut tree, "gw").unwrap();
        for id in ["a", "b", "c"] {
            evaluate(&mut tree, id, false);
        }

        let gw = gateway(&tree);
        assert!(matches!(
            resolve_exclusive_fork(&tree, &gw),
            Err(ExecutionError::NoSelectedFlow(_))
        ));
    }

    #[test]
    fn test_parallel_targets() {
        let gw = Node::new("p", "parallelGateway", NodeKind::ParallelGateway)
            .with_outgoing("x")
            .with_outgoing("y");
        assert_eq!(parallel_targets(&gw).unwrap(), vec!["x", "y"]);

        let broken = gw.with_outgoing(" ");
        assert!(matches!(
            parallel_targets(&broken),
            Err(ExecutionError::MissingFlowId(_))
        ));
    }

    #[test]
    fn test_blank_edge_ids_are_missing_flow_ids() {
        let mut tree = tree(Some("c"));
        let mut gw = gateway(&tree);
        gw.incoming.push(EdgeRef::new(""));
        assert!(matches!(
            join_satisfied(&tree, &gw, JoinPolicy::All),
            Err(ExecutionError::MissingFlowId(_))
        ));

        let mut gw = gateway(&tree);
        gw.outgoing.insert(0, EdgeRef::new("  "));
        assert!(matches!(
            resolve_exclusive_fork(&tree, &gw),
            Err(ExecutionError::MissingFlowId(_))
        ));
        assert!(matches!(
            exclusive_target(&tree, &gw),
            Err(ExecutionError::MissingFlowId(_))
        ));

        tree.insert(gw);
        assert!(matches!(
            prepare_exclusive_fork(&mut tree, "gw"),
            Err(ExecutionError::MissingFlowId(_))
        ));
    }
}
