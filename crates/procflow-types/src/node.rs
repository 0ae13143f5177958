//! Typed process-graph nodes.
//!
//! A [`Node`] is one vertex of a process definition: an event, a task, a
//! gateway or a sequence flow. The type-specific data lives in [`NodeKind`];
//! the node's progress lives in its nullable [`State`] (absent = not started).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Per-node execution state.
///
/// Strictly monotonic: `None -> Start -> Wait -> End`. A node may skip `Wait`
/// but never moves backwards, and `End` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Start,
    Wait,
    End,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Start => "start",
            State::Wait => "wait",
            State::End => "end",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Element types
// ---------------------------------------------------------------------------

/// The built-in element types the engine knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Process,
    SubProcess,
    StartEvent,
    EndEvent,
    Task,
    ExclusiveGateway,
    ParallelGateway,
    SequenceFlow,
}

impl ElementType {
    /// Process and SubProcess own a StartEvent/EndEvent pair.
    pub fn is_scope(&self) -> bool {
        matches!(self, ElementType::Process | ElementType::SubProcess)
    }

    pub fn is_gateway(&self) -> bool {
        matches!(
            self,
            ElementType::ExclusiveGateway | ElementType::ParallelGateway
        )
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::Process => "Process",
            ElementType::SubProcess => "SubProcess",
            ElementType::StartEvent => "StartEvent",
            ElementType::EndEvent => "EndEvent",
            ElementType::Task => "Task",
            ElementType::ExclusiveGateway => "ExclusiveGateway",
            ElementType::ParallelGateway => "ParallelGateway",
            ElementType::SequenceFlow => "SequenceFlow",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Type-specific data
// ---------------------------------------------------------------------------

/// Sequence-flow data: the edge endpoints plus condition bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<String>,
    /// Whether the flow waits for an externally supplied `condition`.
    #[serde(default)]
    pub conditional: bool,
    /// Outcome of the condition; `None` until evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    #[serde(default)]
    pub evaluated: bool,
    /// When set, an ended flow hands control back to its source instead of
    /// its target (exclusive-gateway evaluation round trip).
    #[serde(default)]
    pub execute_previous_when_evaluated: bool,
}

impl FlowData {
    pub fn new(source_ref: impl Into<String>, target_ref: impl Into<String>) -> Self {
        Self {
            source_ref: Some(source_ref.into()),
            target_ref: Some(target_ref.into()),
            ..Self::default()
        }
    }

    pub fn is_selected(&self) -> bool {
        self.selected.unwrap_or(false)
    }
}

/// Type tag plus type-specific data for a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Process,
    SubProcess,
    StartEvent,
    EndEvent,
    Task,
    ExclusiveGateway {
        /// Id of the fallback outgoing flow.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
    ParallelGateway,
    SequenceFlow(FlowData),
}

impl NodeKind {
    /// Empty data for the given element type.
    pub fn for_element(element: ElementType) -> Self {
        match element {
            ElementType::Process => NodeKind::Process,
            ElementType::SubProcess => NodeKind::SubProcess,
            ElementType::StartEvent => NodeKind::StartEvent,
            ElementType::EndEvent => NodeKind::EndEvent,
            ElementType::Task => NodeKind::Task,
            ElementType::ExclusiveGateway => NodeKind::ExclusiveGateway { default: None },
            ElementType::ParallelGateway => NodeKind::ParallelGateway,
            ElementType::SequenceFlow => NodeKind::SequenceFlow(FlowData::default()),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            NodeKind::Process => ElementType::Process,
            NodeKind::SubProcess => ElementType::SubProcess,
            NodeKind::StartEvent => ElementType::StartEvent,
            NodeKind::EndEvent => ElementType::EndEvent,
            NodeKind::Task => ElementType::Task,
            NodeKind::ExclusiveGateway { .. } => ElementType::ExclusiveGateway,
            NodeKind::ParallelGateway => ElementType::ParallelGateway,
            NodeKind::SequenceFlow(_) => ElementType::SequenceFlow,
        }
    }
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// Raw edge descriptor stored in a node's `incoming`/`outgoing` lists.
///
/// The id equals the id of the SequenceFlow node the edge refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRef {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl EdgeRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }

    /// The edge id, or `None` when it is blank.
    pub fn id(&self) -> Option<&str> {
        let id = self.id.trim();
        (!id.is_empty()).then_some(id)
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A typed vertex in the process graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Element id, stable across re-executions of the same definition.
    pub id: String,
    /// Execution id, assigned the first time the executor touches the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Definition tag without namespace prefix (e.g. `userTask`).
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Enclosing Process/SubProcess; `None` only for the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub state: Option<State>,
    pub kind: NodeKind,
    #[serde(default)]
    pub incoming: Vec<EdgeRef>,
    #[serde(default)]
    pub outgoing: Vec<EdgeRef>,
    /// Unrecognised definition attributes, preserved verbatim.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, tag: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            uid: None,
            tag: tag.into(),
            name: None,
            parent_id: None,
            state: None,
            kind,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            attributes: Map::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_incoming(mut self, edge_id: impl Into<String>) -> Self {
        self.incoming.push(EdgeRef::new(edge_id));
        self
    }

    pub fn with_outgoing(mut self, edge_id: impl Into<String>) -> Self {
        self.outgoing.push(EdgeRef::new(edge_id));
        self
    }

    pub fn element_type(&self) -> ElementType {
        self.kind.element_type()
    }

    pub fn has_ended(&self) -> bool {
        self.state == Some(State::End)
    }

    /// `Start` or `Wait`: entered but not finished.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, Some(State::Start) | Some(State::Wait))
    }

    pub fn has_incoming(&self, edge_id: &str) -> bool {
        self.incoming.iter().any(|e| e.id == edge_id)
    }

    pub fn has_outgoing(&self, edge_id: &str) -> bool {
        self.outgoing.iter().any(|e| e.id == edge_id)
    }

    pub fn flow(&self) -> Option<&FlowData> {
        match &self.kind {
            NodeKind::SequenceFlow(flow) => Some(flow),
            _ => None,
        }
    }

    pub fn flow_mut(&mut self) -> Option<&mut FlowData> {
        match &mut self.kind {
            NodeKind::SequenceFlow(flow) => Some(flow),
            _ => None,
        }
    }

    /// The configured default flow of an exclusive gateway.
    pub fn default_flow(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::ExclusiveGateway { default } => default.as_deref(),
            _ => None,
        }
    }

    /// Human-readable identification used in logs and error messages:
    /// `Kind:id (name) #uid`.
    pub fn debug_name(&self) -> String {
        let mut name = format!("{}:{}", self.element_type(), self.id);
        if let Some(display) = self.name.as_deref().filter(|n| !n.is_empty()) {
            name.push_str(&format!(" ({display})"));
        }
        if let Some(uid) = self.uid.as_deref().filter(|u| !u.is_empty()) {
            name.push_str(&format!(" #{uid}"));
        }
        name
    }
}
