//! Process repository trait definition.

use procflow_types::error::RepositoryError;
use procflow_types::process::Process;
use serde_json::Value;
use uuid::Uuid;

/// Repository trait for process persistence.
///
/// Implementations live in procflow-infra (e.g., SqliteProcessRepository).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ProcessRepository: Send + Sync {
    /// Insert a new process. Fails with `Conflict` if the id already exists.
    fn create(
        &self,
        process: &Process,
    ) -> impl std::future::Future<Output = Result<Process, RepositoryError>> + Send;

    /// Insert or replace a process (tree, input, metadata, timestamps).
    fn save(
        &self,
        process: &Process,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a process by id.
    fn get(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Process>, RepositoryError>> + Send;

    /// List processes, most recently updated first.
    fn list(
        &self,
        limit: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<Process>, RepositoryError>> + Send;

    /// Delete a process by id. Returns `true` if it existed.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Processes whose metadata at the dotted path `key` equals `value`,
    /// with JSON types compared exactly (`true` does not match `1`).
    fn find_by_metadata(
        &self,
        key: &str,
        value: &Value,
    ) -> impl std::future::Future<Output = Result<Vec<Process>, RepositoryError>> + Send;
}
