//! Process executor: walks the graph for one trigger call.
//!
//! # Execution flow
//!
//! 1. Resolve the entry node (the root when none is given).
//! 2. Depth-first over a work stack: assign the node's `uid` on first touch,
//!    advance it through its registered behavior and push the returned next
//!    ids so they are visited in order.
//! 3. A failure of the entry node aborts the call. A failure of any node
//!    reached afterwards is reported and halts only that branch.
//! 4. The process is saved whether the walk succeeded or not, so committed
//!    transitions are never dropped.
//!
//! Every state change is written straight into the process arena, which is
//! what gets persisted.

use std::sync::Arc;

use chrono::Utc;
use procflow_types::error::{ExecutionError, RepositoryError};
use procflow_types::event::ProcessEvent;
use procflow_types::node::State;
use procflow_types::process::Process;
use uuid::Uuid;

use crate::event::EventBus;
use crate::node::{AdvanceContext, Next};
use crate::observer::{NoopObserver, StateObserver};
use crate::registry::NodeRegistry;
use crate::report::{BranchFailure, ErrorReporter, TracingErrorReporter, TriggerReport};
use crate::repository::ProcessRepository;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default upper bound on node advances per trigger call.
pub const DEFAULT_MAX_STEPS_PER_TRIGGER: usize = 10_000;

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Drives one process instance per call.
///
/// Generic over `R: ProcessRepository` for storage flexibility. The executor
/// performs no locking of its own; callers serialize calls per process (see
/// [`ProcessLocks`](crate::service::ProcessLocks)).
pub struct Executor<R: ProcessRepository> {
    repo: Arc<R>,
    registry: Arc<NodeRegistry>,
    observer: Arc<dyn StateObserver>,
    reporter: Arc<dyn ErrorReporter>,
    event_bus: Option<EventBus>,
    max_steps: usize,
}

impl<R: ProcessRepository> Executor<R> {
    pub fn new(repo: Arc<R>, registry: Arc<NodeRegistry>) -> Self {
        Self {
            repo,
            registry,
            observer: Arc::new(NoopObserver),
            reporter: Arc::new(TracingErrorReporter),
            event_bus: None,
            max_steps: DEFAULT_MAX_STEPS_PER_TRIGGER,
        }
    }

    /// Notification hook consulted before every state change.
    pub fn with_observer(mut self, observer: Arc<dyn StateObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Sink for failures isolated to one branch.
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Publish trigger lifecycle events to `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// The trigger entry point: walk the process from `node_id` (or the
    /// root), then persist it.
    ///
    /// The save happens even when the walk aborts. A fatal execution error
    /// takes precedence over a failed save, which is then only logged.
    pub async fn execute(
        &self,
        process: &mut Process,
        node_id: Option<&str>,
    ) -> Result<TriggerReport, ExecutorError> {
        let process_id = process.id;
        self.publish(ProcessEvent::TriggerStarted {
            process_id,
            node_id: node_id.unwrap_or(process.tree.root_id()).to_string(),
        });

        let outcome = self.run(process, node_id);

        process.updated_at = Utc::now();
        let saved = self.repo.save(process).await;

        match (outcome, saved) {
            (Ok(report), Ok(())) => {
                tracing::info!(
                    process_id = %process_id,
                    entry = %report.entry,
                    steps = report.steps,
                    failures = report.failures.len(),
                    root_state = ?report.root_state,
                    "trigger completed"
                );
                self.publish(ProcessEvent::TriggerCompleted {
                    process_id,
                    steps: report.steps,
                    failures: report.failures.len(),
                    root_state: report.root_state,
                });
                Ok(report)
            }
            (Ok(_), Err(e)) => {
                tracing::error!(process_id = %process_id, error = %e, "failed to persist process");
                self.publish(ProcessEvent::TriggerFailed {
                    process_id,
                    error: e.to_string(),
                });
                Err(ExecutorError::Repository(e))
            }
            (Err(err), saved) => {
                if let Err(e) = saved {
                    tracing::warn!(
                        process_id = %process_id,
                        error = %e,
                        "failed to persist process after aborted trigger"
                    );
                }
                self.publish(ProcessEvent::TriggerFailed {
                    process_id,
                    error: err.to_string(),
                });
                Err(ExecutorError::Execution(err))
            }
        }
    }

    /// Walk the process without persisting it.
    pub fn run(
        &self,
        process: &mut Process,
        node_id: Option<&str>,
    ) -> Result<TriggerReport, ExecutionError> {
        let entry = self.resolve_entry(process, node_id)?;
        let mut report = TriggerReport::new(process.id, entry.clone());

        tracing::debug!(process_id = %process.id, entry = %entry, "starting executor");

        // (node id, is the entry node)
        let mut stack: Vec<(String, bool)> = vec![(entry, true)];
        while let Some((id, is_entry)) = stack.pop() {
            if report.steps >= self.max_steps {
                return Err(ExecutionError::StepLimitExceeded {
                    max: self.max_steps,
                });
            }
            report.steps += 1;

            match self.advance(process, &id) {
                Ok(next) => {
                    report.visited.push(id);
                    stack.extend(next.into_ids().into_iter().rev().map(|n| (n, false)));
                }
                Err(err) if is_entry => return Err(err),
                Err(err) => {
                    self.reporter.report(process, &id, &err);
                    self.publish(ProcessEvent::BranchFailed {
                        process_id: process.id,
                        node_id: id.clone(),
                        error: err.to_string(),
                    });
                    report.failures.push(BranchFailure {
                        node_id: id,
                        error: err,
                    });
                }
            }
        }

        report.root_state = process.root_state();
        tracing::debug!(
            process_id = %process.id,
            steps = report.steps,
            "finishing executor"
        );
        Ok(report)
    }

    fn resolve_entry(
        &self,
        process: &Process,
        node_id: Option<&str>,
    ) -> Result<String, ExecutionError> {
        let tree = &process.tree;
        match node_id {
            None => Ok(tree.root_id().to_string()),
            Some(id) if tree.contains(id) => Ok(id.to_string()),
            Some(id) => Err(ExecutionError::NodeNotFound {
                id: id.to_string(),
                root: tree.root().debug_name(),
            }),
        }
    }

    /// Advance a single node.
    fn advance(&self, process: &mut Process, id: &str) -> Result<Next, ExecutionError> {
        let root = process.tree.root().debug_name();
        let node = process
            .tree
            .get_mut(id)
            .ok_or_else(|| ExecutionError::NodeNotFound {
                id: id.to_string(),
                root,
            })?;

        if node.uid.is_none() {
            node.uid = Some(format!("{}-{}", node.id, Uuid::now_v7()));
        }

        let name = node.debug_name();
        let from = node.state;
        let behavior = self.registry.behavior_for(node)?;

        tracing::debug!(
            process_id = %process.id,
            node = %name,
            from = ?from,
            "advancing node"
        );

        let mut ctx = AdvanceContext::new(process, id, self.observer.as_ref());
        match behavior.advance(&mut ctx) {
            Ok(next) => {
                tracing::debug!(
                    process_id = %process.id,
                    node = %name,
                    to = ?state_after(process, id),
                    next = ?next,
                    "advanced node"
                );
                Ok(next)
            }
            Err(err) => {
                tracing::error!(
                    process_id = %process.id,
                    node = %name,
                    state = ?state_after(process, id),
                    error = %err,
                    "failed advancing node"
                );
                Err(err)
            }
        }
    }

    fn publish(&self, event: ProcessEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

fn state_after(process: &Process, id: &str) -> Option<State> {
    process.tree.get(id).and_then(|n| n.state)
}

// ---------------------------------------------------------------------------
// ExecutorError
// ---------------------------------------------------------------------------

/// Errors surfaced by a trigger call.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The walk aborted; progress up to the failure was persisted.
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// The walk succeeded but the process could not be persisted.
    #[error("persistence error: {0}")]
    Repository(#[from] RepositoryError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
