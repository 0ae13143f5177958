use thiserror::Error;

/// Errors raised while turning a definition document into a process tree.
///
/// Always fatal; a definition that fails here is never executed.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("definition does not contain any 'process' element")]
    MissingProcess,

    #[error("definition contains {0} 'process' elements, only one is supported")]
    MultipleProcesses(usize),

    #[error("element tag '{0}' is invalid or not supported")]
    UnknownTag(String),

    #[error("child at index {index} of '{parent}' does not have an id")]
    MissingId { parent: String, index: usize },

    #[error("duplicate element id '{0}'")]
    DuplicateId(String),

    #[error("'{0}' does not contain a StartEvent element")]
    MissingStartEvent(String),

    #[error("'{0}' does not contain an EndEvent element")]
    MissingEndEvent(String),

    #[error("'{0}' contains more than one StartEvent element")]
    MultipleStartEvents(String),

    #[error("'{0}' contains more than one EndEvent element")]
    MultipleEndEvents(String),

    #[error("'{node}' references unknown element '{reference}'")]
    UnknownReference { node: String, reference: String },

    #[error("default flow '{flow}' of '{gateway}' is not one of its outgoing flows")]
    InvalidDefault { gateway: String, flow: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Execution-contract violations raised while advancing a node.
///
/// Fatal when raised for the node a trigger call explicitly requested;
/// isolated to the branch otherwise.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("element '{id}' not found in '{root}'")]
    NodeNotFound { id: String, root: String },

    #[error("{0}: does not have an outgoing flow")]
    MissingOutgoingFlow(String),

    #[error("{0}: the outgoing flow does not have an id")]
    MissingFlowId(String),

    #[error("{0}: does not have a sourceRef")]
    MissingSourceRef(String),

    #[error("{0}: does not have a targetRef")]
    MissingTargetRef(String),

    #[error("{0}: does not have a parent")]
    MissingParent(String),

    #[error("{0} does not contain a StartEvent element")]
    MissingStartEvent(String),

    #[error("{0} does not contain an EndEvent element")]
    MissingEndEvent(String),

    #[error("element '{0}' is not a SequenceFlow")]
    NotASequenceFlow(String),

    #[error("{gateway}: multiple selected flows ({}), there must be only one or none (default)", .flows.join(", "))]
    MultipleSelectedFlows { gateway: String, flows: Vec<String> },

    #[error("{0}: no outgoing flow selected and there is no default outgoing flow")]
    NoSelectedFlow(String),

    #[error("{node}: no behavior registered for tag '{tag}'")]
    UnknownTag { node: String, tag: String },

    #[error("{0} is an unprocessable element and cannot be advanced")]
    Unprocessable(String),

    #[error("{node}: state change to '{to}' rejected: {reason}")]
    StateChangeRejected {
        node: String,
        to: String,
        reason: String,
    },

    #[error("trigger exceeded the limit of {max} node advances")]
    StepLimitExceeded { max: usize },
}

/// Errors from repository operations (used by trait definitions in procflow-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Raised by a state-change observer to veto a transition.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
