//! The persisted process aggregate.
//!
//! A [`Process`] is one running instance of a definition: its execution tree,
//! the externally supplied per-node input, and free-form metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::node::State;
use crate::tree::ProcessTree;

/// One process instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    /// UUIDv7 assigned on instantiation.
    pub id: Uuid,
    /// Arbitrary caller metadata (e.g. business keys).
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// External input keyed by node id. Tasks read `state`, conditional
    /// flows read `condition`.
    #[serde(default)]
    pub input: Map<String, Value>,
    /// The execution tree; the only durable representation of progress.
    pub tree: ProcessTree,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Process {
    /// Create a fresh instance around a freshly built tree.
    pub fn from_tree(tree: ProcessTree, metadata: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            metadata,
            input: Map::new(),
            tree,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn debug_name(&self) -> String {
        format!("#{}", self.id)
    }

    /// Input payload supplied for `node_id`, if any.
    pub fn input_for(&self, node_id: &str) -> Option<&Value> {
        self.input.get(node_id)
    }

    pub fn set_input_for(&mut self, node_id: impl Into<String>, payload: Value) -> &mut Self {
        self.input.insert(node_id.into(), payload);
        self
    }

    /// Read a metadata value by dotted path (`customer.id`).
    pub fn metadata_value(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.metadata.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Write a metadata value by dotted path, creating intermediate objects.
    ///
    /// A non-object value sitting on the path is replaced by an object.
    pub fn set_metadata(&mut self, path: &str, value: Value) -> &mut Self {
        let segments: Vec<&str> = path.split('.').collect();
        insert_path(&mut self.metadata, &segments, value);
        self
    }

    /// State of the root Process node.
    pub fn root_state(&self) -> Option<State> {
        self.tree.root().state
    }

    pub fn is_completed(&self) -> bool {
        self.root_state() == Some(State::End)
    }
}

fn insert_path(map: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            map.insert(last.to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeKind};
    use serde_json::json;

    fn sample_process() -> Process {
        let tree = ProcessTree::new(Node::new("proc", "process", NodeKind::Process));
        Process::from_tree(tree, Map::new())
    }

    #[test]
    fn test_input_for_returns_payload() {
        let mut process = sample_process();
        assert!(process.input_for("task1").is_none());

        process.set_input_for("task1", json!({"state": "end"}));
        assert_eq!(process.input_for("task1").unwrap()["state"], "end");
    }

    #[test]
    fn test_metadata_dotted_paths() {
        let mut process = sample_process();
        process
            .set_metadata("customer.id", json!(42))
            .set_metadata("customer.tags", json!(["vip"]))
            .set_metadata("channel", json!("web"));

        assert_eq!(process.metadata_value("customer.id"), Some(&json!(42)));
        assert_eq!(process.metadata_value("customer.tags.0"), Some(&json!("vip")));
        assert_eq!(process.metadata_value("channel"), Some(&json!("web")));
        assert!(process.metadata_value("customer.missing").is_none());
        assert!(process.metadata_value("channel.nested").is_none());
    }

    #[test]
    fn test_set_metadata_overwrites_scalar_on_path() {
        let mut process = sample_process();
        process.set_metadata("a", json!(1));
        process.set_metadata("a.b", json!(2));
        assert_eq!(process.metadata_value("a.b"), Some(&json!(2)));
    }

    #[test]
    fn test_root_state_and_completion() {
        let mut process = sample_process();
        assert_eq!(process.root_state(), None);
        assert!(!process.is_completed());

        process.tree.root_mut().state = Some(State::End);
        assert!(process.is_completed());
        assert!(process.debug_name().starts_with('#'));
    }
}
