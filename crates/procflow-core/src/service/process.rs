//! Process lifecycle service.
//!
//! Orchestrates instantiation from a definition document, external input,
//! trigger calls and deletion. Every mutating call runs under the process's
//! lock from [`ProcessLocks`], so two callers can never interleave the
//! load-advance-save cycle of one process.

use std::sync::Arc;

use chrono::Utc;
use procflow_types::error::{DefinitionError, RepositoryError};
use procflow_types::process::Process;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::definition::parse_definition_yaml;
use crate::executor::{Executor, ExecutorError};
use crate::registry::NodeRegistry;
use crate::report::TriggerReport;
use crate::repository::ProcessRepository;
use crate::service::lock::ProcessLocks;

/// Errors surfaced by [`ProcessService`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("process {0} not found")]
    NotFound(Uuid),

    #[error("invalid definition: {0}")]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Service owning the process lifecycle.
///
/// Generic over the repository trait -- procflow-core never depends on
/// procflow-infra.
pub struct ProcessService<R: ProcessRepository> {
    repo: Arc<R>,
    executor: Executor<R>,
    locks: ProcessLocks,
}

impl<R: ProcessRepository> ProcessService<R> {
    /// Build a service around `executor`, sharing its repository and registry.
    pub fn new(executor: Executor<R>) -> Self {
        Self {
            repo: executor.repository().clone(),
            executor,
            locks: ProcessLocks::new(),
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        self.executor.registry()
    }

    pub fn locks(&self) -> &ProcessLocks {
        &self.locks
    }

    /// Parse a YAML or JSON definition and persist a fresh, untriggered
    /// process for it.
    pub async fn instantiate(
        &self,
        definition: &str,
        metadata: Map<String, Value>,
    ) -> Result<Process, ServiceError> {
        let tree = parse_definition_yaml(definition, self.registry())?;
        let process = Process::from_tree(tree, metadata);
        let process = self.repo.create(&process).await?;

        tracing::info!(
            process_id = %process.id,
            root = %process.tree.root().debug_name(),
            nodes = process.tree.len(),
            "instantiated process"
        );
        Ok(process)
    }

    pub async fn get(&self, id: &Uuid) -> Result<Process, ServiceError> {
        self.repo
            .get(id)
            .await?
            .ok_or(ServiceError::NotFound(*id))
    }

    /// Most recently updated first.
    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<Process>, ServiceError> {
        Ok(self.repo.list(limit).await?)
    }

    pub async fn find_by_metadata(
        &self,
        key: &str,
        value: &Value,
    ) -> Result<Vec<Process>, ServiceError> {
        Ok(self.repo.find_by_metadata(key, value).await?)
    }

    /// Delete a process. Returns `false` when it did not exist.
    pub async fn delete(&self, id: &Uuid) -> Result<bool, ServiceError> {
        let _guard = self.locks.acquire(*id).await;
        let deleted = self.repo.delete(id).await?;
        if deleted {
            tracing::info!(process_id = %id, "deleted process");
        }
        Ok(deleted)
    }

    /// Store the external input payload for `node_id` without triggering.
    pub async fn set_input(
        &self,
        id: &Uuid,
        node_id: &str,
        payload: Value,
    ) -> Result<Process, ServiceError> {
        let _guard = self.locks.acquire(*id).await;
        let mut process = self.get(id).await?;
        process.set_input_for(node_id, payload);
        process.updated_at = Utc::now();
        self.repo.save(&process).await?;

        tracing::debug!(process_id = %id, node_id = %node_id, "stored input");
        Ok(process)
    }

    /// Run one trigger call on a stored process, from `node_id` or the root.
    pub async fn trigger(
        &self,
        id: &Uuid,
        node_id: Option<&str>,
    ) -> Result<(Process, TriggerReport), ServiceError> {
        let _guard = self.locks.acquire(*id).await;
        let mut process = self.get(id).await?;
        let report = self.executor.execute(&mut process, node_id).await?;
        Ok((process, report))
    }

    /// Store input for `node_id` and trigger the root in one locked step.
    pub async fn set_input_and_trigger(
        &self,
        id: &Uuid,
        node_id: &str,
        payload: Value,
    ) -> Result<(Process, TriggerReport), ServiceError> {
        let _guard = self.locks.acquire(*id).await;
        let mut process = self.get(id).await?;
        process.set_input_for(node_id, payload);
        let report = self.executor.execute(&mut process, None).await?;
        Ok((process, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use procflow_types::error::ExecutionError;
    use procflow_types::node::State;
    use serde_json::json;

    fn service() -> (Arc<MemoryRepository>, ProcessService<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::default());
        let executor = Executor::new(repo.clone(), Arc::new(NodeRegistry::with_defaults()));
        (repo, ProcessService::new(executor))
    }

    fn meta(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn instantiate_persists_untriggered_process() {
        let (repo, service) = service();
        let process = service
            .instantiate(LINEAR, meta(&[("order", json!(42))]))
            .await
            .unwrap();

        assert_eq!(process.root_state(), None);
        assert_eq!(process.metadata_value("order"), Some(&json!(42)));
        assert!(repo.stored(&process.id).is_some());
    }

    #[tokio::test]
    async fn instantiate_rejects_invalid_definition() {
        let (_, service) = service();
        let err = service
            .instantiate("elements: []", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Definition(DefinitionError::MissingProcess)
        ));
    }

    #[tokio::test]
    async fn get_unknown_process_is_not_found() {
        let (_, service) = service();
        let id = Uuid::now_v7();
        let err = service.get(&id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(missing) if missing == id));

        let err = service.trigger(&id, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn linear_lifecycle_through_service() {
        let (_, service) = service();
        let process = service.instantiate(LINEAR, Map::new()).await.unwrap();

        let (process, report) = service.trigger(&process.id, None).await.unwrap();
        assert_eq!(report.root_state, Some(State::Start));
        assert_eq!(state_of(&process, "task"), Some(State::Wait));

        let stored = service
            .set_input(&process.id, "task", json!({ "state": "end" }))
            .await
            .unwrap();
        assert_eq!(stored.input_for("task"), Some(&json!({ "state": "end" })));
        // Input alone does not advance anything.
        assert_eq!(state_of(&stored, "task"), Some(State::Wait));

        let (process, report) = service.trigger(&process.id, None).await.unwrap();
        assert!(report.completed());
        assert!(service.get(&process.id).await.unwrap().is_completed());
    }

    #[tokio::test]
    async fn fatal_trigger_error_is_surfaced() {
        let (_, service) = service();
        let process = service.instantiate(LINEAR, Map::new()).await.unwrap();

        let err = service
            .trigger(&process.id, Some("nope"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Executor(ExecutorError::Execution(ExecutionError::NodeNotFound { .. }))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_inputs_are_not_lost() {
        let (_, service) = service();
        let service = Arc::new(service);
        let process = service.instantiate(PARALLEL, Map::new()).await.unwrap();
        service.trigger(&process.id, None).await.unwrap();

        let handles: Vec<_> = ["task1", "task2"]
            .into_iter()
            .map(|task| {
                let service = service.clone();
                let id = process.id;
                tokio::spawn(async move {
                    service
                        .set_input_and_trigger(&id, task, json!({ "state": "end" }))
                        .await
                        .map(|_| ())
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let process = service.get(&process.id).await.unwrap();
        assert!(process.input_for("task1").is_some());
        assert!(process.input_for("task2").is_some());
        assert_eq!(state_of(&process, "join"), Some(State::End));
        assert!(process.is_completed());
        assert!(service.locks().is_empty());
    }

    #[tokio::test]
    async fn list_find_and_delete() {
        let (_, service) = service();
        let a = service
            .instantiate(LINEAR, meta(&[("customer", json!("acme"))]))
            .await
            .unwrap();
        let b = service
            .instantiate(PARALLEL, meta(&[("customer", json!("globex"))]))
            .await
            .unwrap();

        assert_eq!(service.list(None).await.unwrap().len(), 2);
        assert_eq!(service.list(Some(1)).await.unwrap().len(), 1);

        let found = service
            .find_by_metadata("customer", &json!("acme"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a.id);

        assert!(service.delete(&b.id).await.unwrap());
        assert!(!service.delete(&b.id).await.unwrap());
        assert!(matches!(
            service.get(&b.id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
        assert!(service.locks().is_empty());
    }
}
