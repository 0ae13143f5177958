//! The view a node behavior gets of the process while advancing.

use procflow_types::error::ExecutionError;
use procflow_types::node::{FlowData, Node, State};
use procflow_types::process::Process;
use procflow_types::tree::ProcessTree;
use serde_json::Value;

use crate::observer::StateObserver;

/// Mutable access to one process, scoped to the node being advanced.
///
/// The tree is an arena, so every write made here is immediately visible to
/// later lookups in the same trigger call and to the persisted snapshot.
pub struct AdvanceContext<'a> {
    process: &'a mut Process,
    node_id: &'a str,
    observer: &'a dyn StateObserver,
}

impl<'a> AdvanceContext<'a> {
    pub fn new(
        process: &'a mut Process,
        node_id: &'a str,
        observer: &'a dyn StateObserver,
    ) -> Self {
        Self {
            process,
            node_id,
            observer,
        }
    }

    pub fn node_id(&self) -> &str {
        self.node_id
    }

    pub fn process(&self) -> &Process {
        self.process
    }

    pub fn tree(&self) -> &ProcessTree {
        &self.process.tree
    }

    pub fn tree_mut(&mut self) -> &mut ProcessTree {
        &mut self.process.tree
    }

    /// The node being advanced.
    pub fn node(&self) -> Result<&Node, ExecutionError> {
        self.lookup(self.node_id)
    }

    pub fn node_mut(&mut self) -> Result<&mut Node, ExecutionError> {
        let root = self.process.tree.root().debug_name();
        let id = self.node_id;
        self.process
            .tree
            .get_mut(id)
            .ok_or_else(|| ExecutionError::NodeNotFound {
                id: id.to_string(),
                root,
            })
    }

    /// Current state of the node being advanced.
    pub fn state(&self) -> Result<Option<State>, ExecutionError> {
        Ok(self.node()?.state)
    }

    /// External input supplied for the node being advanced.
    pub fn input(&self) -> Option<&Value> {
        self.process.input_for(self.node_id)
    }

    /// Look up any node of the tree.
    pub fn lookup(&self, id: &str) -> Result<&Node, ExecutionError> {
        self.process
            .tree
            .get(id)
            .ok_or_else(|| ExecutionError::NodeNotFound {
                id: id.to_string(),
                root: self.process.tree.root().debug_name(),
            })
    }

    /// Flow data of the SequenceFlow node `id`.
    pub fn flow(&self, id: &str) -> Result<&FlowData, ExecutionError> {
        flow_data(&self.process.tree, id)
    }

    /// Move the node being advanced to `to`.
    ///
    /// No-op when the node is already in `to`. Otherwise the observer is
    /// called first; if it rejects the change the state is left untouched.
    pub fn change_state(&mut self, to: State) -> Result<(), ExecutionError> {
        let node = self.node()?;
        if node.state == Some(to) {
            return Ok(());
        }

        if let Err(err) = self.observer.on_state_changing(self.process, node, to) {
            return Err(ExecutionError::StateChangeRejected {
                node: node.debug_name(),
                to: to.to_string(),
                reason: err.to_string(),
            });
        }

        self.node_mut()?.state = Some(to);
        Ok(())
    }
}

/// Flow data of the SequenceFlow node `id` in `tree`.
pub fn flow_data<'t>(tree: &'t ProcessTree, id: &str) -> Result<&'t FlowData, ExecutionError> {
    let node = tree.get(id).ok_or_else(|| ExecutionError::NodeNotFound {
        id: id.to_string(),
        root: tree.root().debug_name(),
    })?;
    node.flow()
        .ok_or_else(|| ExecutionError::NotASequenceFlow(id.to_string()))
}

/// Mutable flow data of the SequenceFlow node `id` in `tree`.
pub fn flow_data_mut<'t>(
    tree: &'t mut ProcessTree,
    id: &str,
) -> Result<&'t mut FlowData, ExecutionError> {
    let root = tree.root().debug_name();
    let node = tree.get_mut(id).ok_or_else(|| ExecutionError::NodeNotFound {
        id: id.to_string(),
        root,
    })?;
    node.flow_mut()
        .ok_or_else(|| ExecutionError::NotASequenceFlow(id.to_string()))
}
