//! Shared fixtures and doubles for the engine's unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use procflow_types::error::{ExecutionError, RepositoryError};
use procflow_types::node::State;
use procflow_types::process::Process;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::definition::parse_definition_yaml;
use crate::registry::NodeRegistry;
use crate::report::ErrorReporter;
use crate::repository::ProcessRepository;

/// start -> task -> end
pub const LINEAR: &str = r#"
elements:
  - tag: process
    id: proc
    children:
      - { tag: startEvent, id: start }
      - { tag: sequenceFlow, id: f1, sourceRef: start, targetRef: task }
      - { tag: userTask, id: task }
      - { tag: sequenceFlow, id: f2, sourceRef: task, targetRef: end }
      - { tag: endEvent, id: end }
"#;

/// start -> gw; gw -(fa, conditional)-> task_a, gw -(fb, default)-> task_b;
/// both tasks lead to end.
pub const EXCLUSIVE: &str = r#"
elements:
  - tag: process
    id: proc
    children:
      - { tag: startEvent, id: start }
      - { tag: sequenceFlow, id: f0, sourceRef: start, targetRef: gw }
      - { tag: exclusiveGateway, id: gw, default: fb }
      - { tag: sequenceFlow, id: fa, sourceRef: gw, targetRef: task_a, conditional: true }
      - { tag: sequenceFlow, id: fb, sourceRef: gw, targetRef: task_b }
      - { tag: task, id: task_a }
      - { tag: task, id: task_b }
      - { tag: sequenceFlow, id: fa_end, sourceRef: task_a, targetRef: end }
      - { tag: sequenceFlow, id: fb_end, sourceRef: task_b, targetRef: end }
      - { tag: endEvent, id: end }
"#;

/// Like [`EXCLUSIVE`] but with two conditional flows and no default.
pub const EXCLUSIVE_NO_DEFAULT: &str = r#"
elements:
  - tag: process
    id: proc
    children:
      - { tag: startEvent, id: start }
      - { tag: sequenceFlow, id: f0, sourceRef: start, targetRef: gw }
      - { tag: exclusiveGateway, id: gw }
      - { tag: sequenceFlow, id: fa, sourceRef: gw, targetRef: task_a, conditional: true }
      - { tag: sequenceFlow, id: fb, sourceRef: gw, targetRef: task_b, conditional: true }
      - { tag: task, id: task_a }
      - { tag: task, id: task_b }
      - { tag: sequenceFlow, id: fa_end, sourceRef: task_a, targetRef: end }
      - { tag: sequenceFlow, id: fb_end, sourceRef: task_b, targetRef: end }
      - { tag: endEvent, id: end }
"#;

/// start -> fork -> (task1 | task2) -> join -> end
pub const PARALLEL: &str = r#"
elements:
  - tag: process
    id: proc
    children:
      - { tag: startEvent, id: start }
      - { tag: sequenceFlow, id: f1, sourceRef: start, targetRef: fork }
      - { tag: parallelGateway, id: fork }
      - { tag: sequenceFlow, id: fa, sourceRef: fork, targetRef: task1 }
      - { tag: sequenceFlow, id: fb, sourceRef: fork, targetRef: task2 }
      - { tag: task, id: task1 }
      - { tag: task, id: task2 }
      - { tag: sequenceFlow, id: fc, sourceRef: task1, targetRef: join }
      - { tag: sequenceFlow, id: fd, sourceRef: task2, targetRef: join }
      - { tag: parallelGateway, id: join }
      - { tag: sequenceFlow, id: fe, sourceRef: join, targetRef: end }
      - { tag: endEvent, id: end }
"#;

/// start -> sub(inner_start -> inner_task -> inner_end) -> end
pub const SUBPROCESS: &str = r#"
elements:
  - tag: process
    id: proc
    children:
      - { tag: startEvent, id: start }
      - { tag: sequenceFlow, id: f1, sourceRef: start, targetRef: sub }
      - tag: subProcess
        id: sub
        children:
          - { tag: startEvent, id: inner_start }
          - { tag: sequenceFlow, id: sf1, sourceRef: inner_start, targetRef: inner_task }
          - { tag: task, id: inner_task }
          - { tag: sequenceFlow, id: sf2, sourceRef: inner_task, targetRef: inner_end }
          - { tag: endEvent, id: inner_end }
      - { tag: sequenceFlow, id: f2, sourceRef: sub, targetRef: end }
      - { tag: endEvent, id: end }
"#;

pub fn process_from(yaml: &str) -> Process {
    let tree = parse_definition_yaml(yaml, &NodeRegistry::with_defaults())
        .expect("fixture definition is valid");
    Process::from_tree(tree, Map::new())
}

pub fn state_of(process: &Process, id: &str) -> Option<State> {
    process.tree.get(id).and_then(|n| n.state)
}

pub fn complete_task(process: &mut Process, id: &str) {
    process.set_input_for(id, serde_json::json!({ "state": "end" }));
}

pub fn decide(process: &mut Process, flow_id: &str, condition: Value) {
    process.set_input_for(flow_id, serde_json::json!({ "condition": condition }));
}

// ---------------------------------------------------------------------------
// Doubles
// ---------------------------------------------------------------------------

/// In-memory repository; `fail_saves` makes every `save` fail.
#[derive(Default)]
pub struct MemoryRepository {
    pub processes: Mutex<HashMap<Uuid, Process>>,
    pub fail_saves: AtomicBool,
}

impl MemoryRepository {
    pub fn stored(&self, id: &Uuid) -> Option<Process> {
        self.processes.lock().unwrap().get(id).cloned()
    }

    pub fn failing_saves(self) -> Self {
        self.fail_saves.store(true, Ordering::SeqCst);
        self
    }
}

impl ProcessRepository for MemoryRepository {
    async fn create(&self, process: &Process) -> Result<Process, RepositoryError> {
        let mut processes = self.processes.lock().unwrap();
        if processes.contains_key(&process.id) {
            return Err(RepositoryError::Conflict(process.id.to_string()));
        }
        processes.insert(process.id, process.clone());
        Ok(process.clone())
    }

    async fn save(&self, process: &Process) -> Result<(), RepositoryError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("disk full".to_string()));
        }
        self.processes
            .lock()
            .unwrap()
            .insert(process.id, process.clone());
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Process>, RepositoryError> {
        Ok(self.stored(id))
    }

    async fn list(&self, limit: Option<i64>) -> Result<Vec<Process>, RepositoryError> {
        let mut all: Vec<Process> = self.processes.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        if let Some(limit) = limit {
            all.truncate(limit.max(0) as usize);
        }
        Ok(all)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        Ok(self.processes.lock().unwrap().remove(id).is_some())
    }

    async fn find_by_metadata(
        &self,
        key: &str,
        value: &Value,
    ) -> Result<Vec<Process>, RepositoryError> {
        Ok(self
            .processes
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.metadata_value(key) == Some(value))
            .cloned()
            .collect())
    }
}

/// Collects reported branch failures.
#[derive(Default)]
pub struct RecordingReporter {
    pub reports: Mutex<Vec<(String, String)>>,
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, _process: &Process, node_id: &str, error: &ExecutionError) {
        self.reports
            .lock()
            .unwrap()
            .push((node_id.to_string(), error.to_string()));
    }
}
