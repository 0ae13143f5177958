//! Process and SubProcess behavior.
//!
//! A scope owns exactly one StartEvent and one EndEvent. While the scope is in
//! START it drives its content: first the StartEvent, afterwards every node of
//! the scope that is still pending. Once its EndEvent has ended the scope
//! itself ends; a SubProcess then continues along its outgoing flow.

use procflow_types::error::ExecutionError;
use procflow_types::node::{ElementType, Node, State};
use procflow_types::tree::ProcessTree;

use super::{AdvanceContext, Next, NodeBehavior, first_outgoing};

#[derive(Debug, Default, Clone, Copy)]
pub struct ScopeBehavior;

impl ScopeBehavior {
    /// Nodes a scope re-drives once its StartEvent has ended.
    ///
    /// The root Process re-drives every pending node of the tree; a
    /// SubProcess only its direct children.
    fn pending_content(tree: &ProcessTree, scope: &Node) -> Vec<String> {
        let is_root = scope.id == tree.root_id();
        let pending = |n: &&Node| n.is_pending();
        if scope.element_type() == ElementType::Process && is_root {
            tree.descendants()
                .filter(pending)
                .map(|n| n.id.clone())
                .collect()
        } else {
            tree.children(&scope.id)
                .filter(pending)
                .map(|n| n.id.clone())
                .collect()
        }
    }

    /// Emission of an already ended scope.
    fn forward(node: &Node) -> Result<Next, ExecutionError> {
        match node.element_type() {
            ElementType::SubProcess => Ok(Next::One(first_outgoing(node)?)),
            _ => Ok(Next::Halt),
        }
    }
}

impl NodeBehavior for ScopeBehavior {
    fn advance(&self, ctx: &mut AdvanceContext<'_>) -> Result<Next, ExecutionError> {
        if ctx.state()?.is_none() {
            ctx.change_state(State::Start)?;
        }

        match ctx.state()? {
            Some(State::Start) => {}
            Some(State::End) => return Self::forward(ctx.node()?),
            _ => return Ok(Next::Halt),
        }

        let tree = ctx.tree();
        let scope = ctx.node()?;

        let end_event = tree
            .find_child(&scope.id, ElementType::EndEvent)
            .ok_or_else(|| ExecutionError::MissingEndEvent(scope.debug_name()))?;
        if end_event.has_ended() {
            let next = Self::forward(scope)?;
            ctx.change_state(State::End)?;
            return Ok(next);
        }

        let start_event = tree
            .find_child(&scope.id, ElementType::StartEvent)
            .ok_or_else(|| ExecutionError::MissingStartEvent(scope.debug_name()))?;
        if !start_event.has_ended() {
            return Ok(Next::One(start_event.id.clone()));
        }

        Ok(Next::many(Self::pending_content(tree, scope)))
    }
}
