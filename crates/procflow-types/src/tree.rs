//! Arena holding every node of one process instance.
//!
//! The whole execution tree is a flat, insertion-ordered list of nodes indexed
//! by id. Parent/child relationships are expressed through `Node::parent_id`,
//! so a mutation made through [`ProcessTree::get_mut`] is immediately visible
//! to every later lookup; there are no detached copies to write back.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::node::{ElementType, Node};

/// Flat node arena rooted at a Process node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeRepr", into = "TreeRepr")]
pub struct ProcessTree {
    root_id: String,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

/// Serialized form: the index is rebuilt on load.
#[derive(Serialize, Deserialize)]
struct TreeRepr {
    root_id: String,
    nodes: Vec<Node>,
}

impl TryFrom<TreeRepr> for ProcessTree {
    type Error = String;

    fn try_from(repr: TreeRepr) -> Result<Self, Self::Error> {
        let mut index = HashMap::with_capacity(repr.nodes.len());
        for (i, node) in repr.nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(format!("duplicate node id '{}' in process tree", node.id));
            }
        }
        if !index.contains_key(&repr.root_id) {
            return Err(format!("root node '{}' missing from process tree", repr.root_id));
        }
        Ok(Self {
            root_id: repr.root_id,
            nodes: repr.nodes,
            index,
        })
    }
}

impl From<ProcessTree> for TreeRepr {
    fn from(tree: ProcessTree) -> Self {
        Self {
            root_id: tree.root_id,
            nodes: tree.nodes,
        }
    }
}

impl ProcessTree {
    /// Create a tree containing only the root node.
    pub fn new(root: Node) -> Self {
        let root_id = root.id.clone();
        let mut index = HashMap::new();
        index.insert(root_id.clone(), 0);
        Self {
            root_id,
            nodes: vec![root],
            index,
        }
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn root(&self) -> &Node {
        &self.nodes[self.index[&self.root_id]]
    }

    pub fn root_mut(&mut self) -> &mut Node {
        let idx = self.index[&self.root_id];
        &mut self.nodes[idx]
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.index.get(id).map(|&i| &mut self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Insert a node, replacing (in place) any node with the same id.
    ///
    /// Returns the replaced node, if any.
    pub fn insert(&mut self, node: Node) -> Option<Node> {
        match self.index.get(&node.id) {
            Some(&i) => Some(std::mem::replace(&mut self.nodes[i], node)),
            None => {
                self.index.insert(node.id.clone(), self.nodes.len());
                self.nodes.push(node);
                None
            }
        }
    }

    /// All nodes in insertion order, root first.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    /// Every node except the root.
    pub fn descendants(&self) -> impl Iterator<Item = &Node> {
        let root_id = self.root_id.as_str();
        self.nodes.iter().filter(move |n| n.id != root_id)
    }

    /// Direct children of `parent_id`, in insertion order.
    pub fn children<'a>(&'a self, parent_id: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.parent_id.as_deref() == Some(parent_id))
    }

    /// First direct child of `parent_id` with the given element type.
    pub fn find_child<'a>(
        &'a self,
        parent_id: &'a str,
        element: ElementType,
    ) -> Option<&'a Node> {
        self.children(parent_id).find(|n| n.element_type() == element)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
