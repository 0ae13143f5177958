//! Trigger reports and the branch error-reporting sink.

use procflow_types::error::ExecutionError;
use procflow_types::node::State;
use procflow_types::process::Process;
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// Sink for errors isolated to one branch of a trigger call.
///
/// Such errors never escape the call; this is the only place they surface.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, process: &Process, node_id: &str, error: &ExecutionError);
}

/// Reports branch failures as `tracing` warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, process: &Process, node_id: &str, error: &ExecutionError) {
        tracing::warn!(
            process_id = %process.id,
            node_id = %node_id,
            error = %error,
            "failed advancing next element, branch halted"
        );
    }
}

/// A node whose advance failed without aborting the trigger call.
#[derive(Debug, Clone, Serialize)]
pub struct BranchFailure {
    pub node_id: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: ExecutionError,
}

/// Summary of one successful trigger call.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerReport {
    pub process_id: Uuid,
    /// The node the call started at.
    pub entry: String,
    /// Node advances performed, failed ones included.
    pub steps: usize,
    /// Successfully advanced node ids, in visiting order.
    pub visited: Vec<String>,
    pub failures: Vec<BranchFailure>,
    pub root_state: Option<State>,
}

impl TriggerReport {
    pub fn new(process_id: Uuid, entry: impl Into<String>) -> Self {
        Self {
            process_id,
            entry: entry.into(),
            steps: 0,
            visited: Vec::new(),
            failures: Vec::new(),
            root_state: None,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn completed(&self) -> bool {
        self.root_state == Some(State::End)
    }
}

fn serialize_display<S: Serializer>(error: &ExecutionError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}
