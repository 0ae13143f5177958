//! Tag registry mapping definition tags to element types and behaviors.
//!
//! A `NodeRegistry` is built once, wrapped in an `Arc` and handed to both the
//! definition builder (which tags become which typed nodes, which tags are
//! skipped) and the executor (which behavior advances a node). There is no
//! global registry.

use std::collections::HashMap;
use std::sync::Arc;

use procflow_types::error::ExecutionError;
use procflow_types::node::{ElementType, Node};

use crate::node::{
    EndEventBehavior, ExclusiveGatewayBehavior, NodeBehavior, ParallelGatewayBehavior,
    ScopeBehavior, SequenceFlowBehavior, StartEventBehavior, TaskBehavior,
};

/// Tags bound to Task semantics by default.
pub const TASK_TAGS: &[&str] = &[
    "task",
    "userTask",
    "manualTask",
    "scriptTask",
    "serviceTask",
    "sendTask",
    "receiveTask",
    "businessRuleTask",
];

/// Tags that are recognised but never executed.
pub const UNPROCESSABLE_TAGS: &[&str] = &["laneSet", "lane", "textAnnotation", "text", "association"];

/// What a tag resolves to.
#[derive(Clone)]
pub enum TagBinding {
    /// An executable element.
    Element {
        element: ElementType,
        behavior: Arc<dyn NodeBehavior>,
    },
    /// Known, but skipped during construction together with its children.
    Unprocessable,
}

impl std::fmt::Debug for TagBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagBinding::Element { element, .. } => {
                f.debug_struct("Element").field("element", element).finish()
            }
            TagBinding::Unprocessable => f.write_str("Unprocessable"),
        }
    }
}

/// The built-in behavior for an element type.
pub fn builtin_behavior(element: ElementType) -> Arc<dyn NodeBehavior> {
    match element {
        ElementType::Process | ElementType::SubProcess => Arc::new(ScopeBehavior),
        ElementType::StartEvent => Arc::new(StartEventBehavior),
        ElementType::EndEvent => Arc::new(EndEventBehavior),
        ElementType::Task => Arc::new(TaskBehavior),
        ElementType::ExclusiveGateway => Arc::new(ExclusiveGatewayBehavior),
        ElementType::ParallelGateway => Arc::new(ParallelGatewayBehavior),
        ElementType::SequenceFlow => Arc::new(SequenceFlowBehavior),
    }
}

/// Strip an XML-style namespace prefix (`bpmn:task` -> `task`).
pub fn local_tag(tag: &str) -> &str {
    tag.rsplit(':').next().unwrap_or(tag)
}

/// Registry of definition tags, indexed by local tag name.
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    bindings: HashMap<String, TagBinding>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Registry with every built-in tag bound.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("process", ElementType::Process);
        registry.register("subProcess", ElementType::SubProcess);
        registry.register("startEvent", ElementType::StartEvent);
        registry.register("endEvent", ElementType::EndEvent);
        registry.register("exclusiveGateway", ElementType::ExclusiveGateway);
        registry.register("parallelGateway", ElementType::ParallelGateway);
        registry.register("sequenceFlow", ElementType::SequenceFlow);
        for tag in TASK_TAGS {
            registry.register(*tag, ElementType::Task);
        }
        for tag in UNPROCESSABLE_TAGS {
            registry.register_unprocessable(*tag);
        }
        registry
    }

    /// Bind `tag` to an element type with its built-in behavior.
    ///
    /// An existing binding for the tag is replaced.
    pub fn register(&mut self, tag: impl Into<String>, element: ElementType) {
        self.register_custom(tag, element, builtin_behavior(element));
    }

    /// Bind `tag` to an element type with a caller-supplied behavior.
    pub fn register_custom(
        &mut self,
        tag: impl Into<String>,
        element: ElementType,
        behavior: Arc<dyn NodeBehavior>,
    ) {
        self.bindings
            .insert(tag.into(), TagBinding::Element { element, behavior });
    }

    pub fn register_unprocessable(&mut self, tag: impl Into<String>) {
        self.bindings.insert(tag.into(), TagBinding::Unprocessable);
    }

    /// Look up a tag, ignoring any namespace prefix.
    pub fn resolve(&self, tag: &str) -> Option<&TagBinding> {
        self.bindings.get(local_tag(tag))
    }

    /// The behavior that advances `node`.
    pub fn behavior_for(&self, node: &Node) -> Result<Arc<dyn NodeBehavior>, ExecutionError> {
        match self.resolve(&node.tag) {
            Some(TagBinding::Element { behavior, .. }) => Ok(Arc::clone(behavior)),
            Some(TagBinding::Unprocessable) => {
                Err(ExecutionError::Unprocessable(node.debug_name()))
            }
            None => Err(ExecutionError::UnknownTag {
                node: node.debug_name(),
                tag: node.tag.clone(),
            }),
        }
    }

    /// All registered tag names, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.bindings.keys().map(|s| s.as_str()).collect();
        tags.sort_unstable();
        tags
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
